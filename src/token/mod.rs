// ABOUTME: Token-side collaborators: signing provider, callback queue, refresh tokens
// ABOUTME: Shares the opaque-token randomness helper used for codes and refresh tokens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

/// Per-issuer token callback overrides and their FIFO queue
pub mod callback;
/// Per-issuer RSA keys, JWKS publication, and JWT signing
pub mod provider;
/// Refresh-token lifecycle tracking
pub mod refresh;

pub use callback::{TokenCallback, TokenCallbackQueue};
pub use provider::{JsonWebKey, JsonWebKeySet, TokenProvider};
pub use refresh::{RefreshContext, RefreshTokenManager};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ring::rand::{SecureRandom, SystemRandom};

use crate::errors::HandlerError;

/// Generate an opaque URL-safe token of `length` random bytes.
///
/// # Errors
/// Returns an error if the system randomness source fails.
pub(crate) fn random_token(length: usize) -> Result<String, HandlerError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; length];
    rng.fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("system randomness source unavailable"))?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}
