// ABOUTME: RFC 8693 token exchange: reissues a subject token's claims for a new audience
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use super::{apply_callback_claims, decode_unverified_claims, GrantHandler, TokenRequest, TokenResponse};
use crate::errors::{ErrorObject, HandlerError};
use crate::token::callback::TokenCallback;
use crate::token::provider::TokenProvider;

/// RFC 8693 token type of the tokens this grant issues.
const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

/// The `urn:ietf:params:oauth:grant-type:token-exchange` grant handler.
pub struct TokenExchangeGrant {
    provider: Arc<TokenProvider>,
}

impl TokenExchangeGrant {
    /// Handler signing with `provider`.
    #[must_use]
    pub fn new(provider: Arc<TokenProvider>) -> Self {
        Self { provider }
    }
}

impl GrantHandler for TokenExchangeGrant {
    fn token_response(
        &self,
        request: &TokenRequest,
        issuer_url: &Url,
        callback: &TokenCallback,
    ) -> Result<TokenResponse, HandlerError> {
        let subject_token = request.subject_token.as_deref().ok_or_else(|| {
            HandlerError::parse(ErrorObject::invalid_request(
                "missing subject_token parameter",
            ))
        })?;

        let mut claims = decode_unverified_claims(subject_token, "subject_token")?;
        if let Some(audience) = &request.audience {
            claims.insert("aud".to_owned(), Value::String(audience.clone()));
        }
        let claims = apply_callback_claims(claims, callback);

        let access_token = self.provider.jwt(claims, callback.expiry, issuer_url)?;

        Ok(TokenResponse {
            issued_token_type: Some(ACCESS_TOKEN_TYPE.to_owned()),
            scope: request.scope.clone(),
            ..TokenResponse::bearer(access_token, callback.expires_in())
        })
    }
}
