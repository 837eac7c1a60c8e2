// ABOUTME: Refresh-token lifecycle tracking with atomic single-use consumption
// ABOUTME: Binds each opaque refresh token to the authorization context it was issued for
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use dashmap::DashMap;
use serde_json::{Map, Value};

use super::random_token;
use crate::errors::HandlerError;

/// Authorization context a refresh token is bound to.
#[derive(Debug, Clone)]
pub struct RefreshContext {
    /// Client the original grant was issued to
    pub client_id: String,
    /// Authenticated subject, if any
    pub subject: Option<String>,
    /// Granted scope
    pub scope: Option<String>,
    /// Claim set of the originally issued token
    pub claims: Map<String, Value>,
}

/// Tracks issued refresh tokens until they are consumed.
///
/// Consumption removes the map entry, so concurrent redemption of the same
/// token has exactly one winner; every other attempt observes a missing entry.
#[derive(Debug, Default)]
pub struct RefreshTokenManager {
    active: DashMap<String, RefreshContext>,
}

impl RefreshTokenManager {
    /// Manager with no outstanding tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue an opaque refresh token bound to `context`.
    ///
    /// # Errors
    /// Returns an error if the randomness source fails.
    pub fn issue(&self, context: RefreshContext) -> Result<String, HandlerError> {
        let token = random_token(32)?;
        self.active.insert(token.clone(), context);
        Ok(token)
    }

    /// Consume `token`, returning its bound context.
    ///
    /// The valid → consumed transition happens exactly once per token;
    /// `None` means the token was never issued or was already consumed.
    #[must_use]
    pub fn consume(&self, token: &str) -> Option<RefreshContext> {
        self.active.remove(token).map(|(_, context)| context)
    }

    /// Number of outstanding (unconsumed) refresh tokens.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
