// ABOUTME: RFC 7523 JWT bearer grant: reissues the assertion's claims under this issuer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use std::sync::Arc;

use url::Url;

use super::{apply_callback_claims, decode_unverified_claims, GrantHandler, TokenRequest, TokenResponse};
use crate::errors::{ErrorObject, HandlerError};
use crate::token::callback::TokenCallback;
use crate::token::provider::TokenProvider;

/// The `urn:ietf:params:oauth:grant-type:jwt-bearer` grant handler.
pub struct JwtBearerGrant {
    provider: Arc<TokenProvider>,
}

impl JwtBearerGrant {
    /// Handler signing with `provider`.
    #[must_use]
    pub fn new(provider: Arc<TokenProvider>) -> Self {
        Self { provider }
    }
}

impl GrantHandler for JwtBearerGrant {
    fn token_response(
        &self,
        request: &TokenRequest,
        issuer_url: &Url,
        callback: &TokenCallback,
    ) -> Result<TokenResponse, HandlerError> {
        let assertion = request.assertion.as_deref().ok_or_else(|| {
            HandlerError::parse(ErrorObject::invalid_request("missing assertion parameter"))
        })?;

        let claims = decode_unverified_claims(assertion, "assertion")?;
        let claims = apply_callback_claims(claims, callback);

        let access_token = self.provider.jwt(claims, callback.expiry, issuer_url)?;

        Ok(TokenResponse {
            scope: request.scope.clone(),
            ..TokenResponse::bearer(access_token, callback.expires_in())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn missing_assertion_is_invalid_request() {
        let grant = JwtBearerGrant::new(Arc::new(TokenProvider::new()));
        let issuer = Url::parse("http://localhost/default").expect("static url");
        let request = TokenRequest::default();

        let err = grant
            .token_response(&request, &issuer, &TokenCallback::standard("default"))
            .unwrap_err();
        assert!(matches!(err, HandlerError::Parse { error: Some(_), .. }));
    }

    #[test]
    fn malformed_assertion_is_invalid_grant() {
        let grant = JwtBearerGrant::new(Arc::new(TokenProvider::new()));
        let issuer = Url::parse("http://localhost/default").expect("static url");
        let request = TokenRequest {
            assertion: Some("definitely-not-a-jwt".to_owned()),
            ..TokenRequest::default()
        };

        let err = grant
            .token_response(&request, &issuer, &TokenCallback::standard("default"))
            .unwrap_err();
        assert!(matches!(err, HandlerError::Protocol(object) if object.error == "invalid_grant"));
    }
}
