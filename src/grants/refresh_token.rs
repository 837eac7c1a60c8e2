// ABOUTME: Refresh-token grant: single-use redemption reissuing the original claim set
// ABOUTME: Every redemption rotates the refresh token; replay fails with invalid_grant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use std::sync::Arc;

use url::Url;

use super::{apply_callback_claims, GrantHandler, TokenRequest, TokenResponse};
use crate::errors::{ErrorObject, HandlerError};
use crate::token::callback::TokenCallback;
use crate::token::provider::TokenProvider;
use crate::token::refresh::{RefreshContext, RefreshTokenManager};

/// The `refresh_token` grant handler.
pub struct RefreshTokenGrant {
    provider: Arc<TokenProvider>,
    refresh_tokens: Arc<RefreshTokenManager>,
}

impl RefreshTokenGrant {
    /// Handler redeeming against `refresh_tokens` and signing with `provider`.
    #[must_use]
    pub fn new(provider: Arc<TokenProvider>, refresh_tokens: Arc<RefreshTokenManager>) -> Self {
        Self {
            provider,
            refresh_tokens,
        }
    }
}

impl GrantHandler for RefreshTokenGrant {
    fn token_response(
        &self,
        request: &TokenRequest,
        issuer_url: &Url,
        callback: &TokenCallback,
    ) -> Result<TokenResponse, HandlerError> {
        let refresh_token = request.refresh_token.as_deref().ok_or_else(|| {
            HandlerError::parse(ErrorObject::invalid_request(
                "missing refresh_token parameter",
            ))
        })?;

        let context = self.refresh_tokens.consume(refresh_token).ok_or_else(|| {
            HandlerError::TokenState("refresh token unknown, expired or already used".to_owned())
        })?;

        let claims = apply_callback_claims(context.claims.clone(), callback);
        let access_token = self
            .provider
            .jwt(claims.clone(), callback.expiry, issuer_url)?;

        let rotated = self.refresh_tokens.issue(RefreshContext {
            claims,
            ..context.clone()
        })?;

        Ok(TokenResponse {
            refresh_token: Some(rotated),
            scope: context.scope,
            ..TokenResponse::bearer(access_token, callback.expires_in())
        })
    }
}
