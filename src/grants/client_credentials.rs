// ABOUTME: Client-credentials grant: machine-to-machine tokens with the client as subject
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use std::sync::Arc;

use serde_json::{Map, Value};
use url::Url;

use super::{apply_callback_claims, GrantHandler, TokenRequest, TokenResponse};
use crate::errors::HandlerError;
use crate::token::callback::TokenCallback;
use crate::token::provider::TokenProvider;

/// The `client_credentials` grant handler.
pub struct ClientCredentialsGrant {
    provider: Arc<TokenProvider>,
}

impl ClientCredentialsGrant {
    /// Handler signing with `provider`.
    #[must_use]
    pub fn new(provider: Arc<TokenProvider>) -> Self {
        Self { provider }
    }
}

impl GrantHandler for ClientCredentialsGrant {
    fn token_response(
        &self,
        request: &TokenRequest,
        issuer_url: &Url,
        callback: &TokenCallback,
    ) -> Result<TokenResponse, HandlerError> {
        let client_id = request.require_client_id()?;

        let mut claims = Map::new();
        claims.insert("sub".to_owned(), Value::String(client_id.to_owned()));
        if let Some(scope) = &request.scope {
            claims.insert("scope".to_owned(), Value::String(scope.clone()));
        }
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
    fn missing_client_id_is_invalid_client() {
        let grant = ClientCredentialsGrant::new(Arc::new(TokenProvider::new()));
        let issuer = Url::parse("http://localhost/default").expect("static url");
        let request = TokenRequest {
            grant_type: "client_credentials".to_owned(),
            ..TokenRequest::default()
        };

        let err = grant
            .token_response(&request, &issuer, &TokenCallback::standard("default"))
            .unwrap_err();
        assert!(matches!(err, HandlerError::Protocol(object) if object.error == "invalid_client"));
    }

    #[test]
    fn scope_is_echoed() {
        let grant = ClientCredentialsGrant::new(Arc::new(TokenProvider::new()));
        let issuer = Url::parse("http://localhost/default").expect("static url");
        let request = TokenRequest {
            grant_type: "client_credentials".to_owned(),
            client_id: Some("machine".to_owned()),
            scope: Some("read write".to_owned()),
            ..TokenRequest::default()
        };

        let response = grant
            .token_response(&request, &issuer, &TokenCallback::standard("default"))
            .expect("token response");
        assert_eq!(response.scope.as_deref(), Some("read write"));
        assert_eq!(response.token_type, "Bearer");
        assert!(response.refresh_token.is_none());
    }
}
