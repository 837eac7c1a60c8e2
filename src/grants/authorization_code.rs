// ABOUTME: Authorization-code grant: code issuance for the authorize endpoint and redemption
// ABOUTME: Codes are one-shot, expire after ten minutes, and bind client, scope, nonce, and login
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

use super::{apply_callback_claims, GrantHandler, TokenRequest, TokenResponse};
use crate::errors::{ErrorObject, HandlerError};
use crate::login::Login;
use crate::token::callback::TokenCallback;
use crate::token::provider::TokenProvider;
use crate::token::refresh::{RefreshContext, RefreshTokenManager};
use crate::token::random_token;

/// Authorization codes are redeemable for this long.
const CODE_LIFETIME_MINUTES: i64 = 10;

/// Parsed OIDC authentication request (the `/authorize` query).
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    /// Requesting client
    pub client_id: String,
    /// Where the code is delivered
    pub redirect_uri: String,
    /// Requested response type; only `code` is supported
    pub response_type: String,
    /// Requested scope
    pub scope: Option<String>,
    /// Opaque client state echoed back on the redirect
    pub state: Option<String>,
    /// OIDC nonce, copied into the ID token
    pub nonce: Option<String>,
    /// OIDC prompt parameter
    pub prompt: Option<String>,
}

impl AuthenticationRequest {
    /// Parse an authentication request from query parameters.
    ///
    /// # Errors
    /// Returns a parse failure carrying an `invalid_request` error object
    /// when `client_id` or `redirect_uri` is missing.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, HandlerError> {
        let require = |name: &str| {
            params.get(name).cloned().ok_or_else(|| {
                HandlerError::parse(ErrorObject::invalid_request(&format!(
                    "missing {name} parameter"
                )))
            })
        };

        Ok(Self {
            client_id: require("client_id")?,
            redirect_uri: require("redirect_uri")?,
            response_type: params
                .get("response_type")
                .cloned()
                .unwrap_or_else(|| "code".to_owned()),
            scope: params.get("scope").cloned(),
            state: params.get("state").cloned(),
            nonce: params.get("nonce").cloned(),
            prompt: params.get("prompt").cloned(),
        })
    }

    /// Does the request itself demand an interactive prompt?
    #[must_use]
    pub fn wants_interactive_login(&self) -> bool {
        self.prompt
            .as_deref()
            .is_some_and(|prompt| prompt.split_whitespace().any(|p| p == "login"))
    }
}

/// Data for the authorization-code redirect back to the client.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeResponse {
    /// Issued one-shot code
    pub code: String,
    /// State from the originating request, echoed verbatim
    pub state: Option<String>,
}

impl AuthorizationCodeResponse {
    /// Redirect URL delivering the code (and state) to `redirect_uri`.
    #[must_use]
    pub fn redirect_url(&self, redirect_uri: &str) -> String {
        let separator = if redirect_uri.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{redirect_uri}{separator}code={}",
            urlencoding::encode(&self.code)
        );
        if let Some(state) = &self.state {
            url.push_str("&state=");
            url.push_str(&urlencoding::encode(state));
        }
        url
    }
}

struct IssuedCode {
    request: AuthenticationRequest,
    login: Option<Login>,
    issued_at: DateTime<Utc>,
}

/// The `authorization_code` grant handler.
///
/// Besides redeeming codes at the token endpoint, it issues them for the
/// authorize endpoint via [`AuthorizationCodeGrant::authorization_code_response`].
pub struct AuthorizationCodeGrant {
    provider: Arc<TokenProvider>,
    refresh_tokens: Arc<RefreshTokenManager>,
    codes: DashMap<String, IssuedCode>,
}

impl AuthorizationCodeGrant {
    /// Handler with no outstanding codes.
    #[must_use]
    pub fn new(provider: Arc<TokenProvider>, refresh_tokens: Arc<RefreshTokenManager>) -> Self {
        Self {
            provider,
            refresh_tokens,
            codes: DashMap::new(),
        }
    }

    /// Issue an authorization code bound to `request` and the submitted
    /// identity, producing the redirect data for the authorize endpoint.
    ///
    /// # Errors
    /// Returns `invalid_request` for a non-`code` response type, or an
    /// internal error if code generation fails.
    pub fn authorization_code_response(
        &self,
        request: AuthenticationRequest,
        login: Option<Login>,
    ) -> Result<AuthorizationCodeResponse, HandlerError> {
        if request.response_type != "code" {
            return Err(ErrorObject::invalid_request(
                "only the 'code' response_type is supported",
            )
            .into());
        }

        let code = random_token(24)?;
        let state = request.state.clone();
        self.codes.insert(
            code.clone(),
            IssuedCode {
                request,
                login,
                issued_at: Utc::now(),
            },
        );
        Ok(AuthorizationCodeResponse { code, state })
    }

    fn redeem(&self, code: &str) -> Result<IssuedCode, HandlerError> {
        let (_, issued) = self.codes.remove(code).ok_or_else(|| {
            HandlerError::TokenState("authorization code unknown or already redeemed".to_owned())
        })?;
        if Utc::now() - issued.issued_at > Duration::minutes(CODE_LIFETIME_MINUTES) {
            return Err(HandlerError::TokenState(
                "authorization code expired".to_owned(),
            ));
        }
        Ok(issued)
    }

    /// Number of outstanding codes.
    #[must_use]
    pub fn pending_codes(&self) -> usize {
        self.codes.len()
    }
}

impl GrantHandler for AuthorizationCodeGrant {
    fn token_response(
        &self,
        request: &TokenRequest,
        issuer_url: &Url,
        callback: &TokenCallback,
    ) -> Result<TokenResponse, HandlerError> {
        let code = request.code.as_deref().ok_or_else(|| {
            HandlerError::parse(ErrorObject::invalid_request("missing code parameter"))
        })?;
        let issued = self.redeem(code)?;

        let subject = issued
            .login
            .as_ref()
            .map_or_else(|| Uuid::new_v4().to_string(), |login| login.username.clone());

        let mut id_claims = Map::new();
        id_claims.insert("sub".to_owned(), Value::String(subject.clone()));
        id_claims.insert(
            "aud".to_owned(),
            Value::String(issued.request.client_id.clone()),
        );
        if let Some(nonce) = &issued.request.nonce {
            id_claims.insert("nonce".to_owned(), Value::String(nonce.clone()));
        }

        let mut access_claims = Map::new();
        access_claims.insert("sub".to_owned(), Value::String(subject.clone()));
        let access_claims = apply_callback_claims(access_claims, callback);

        let id_token = self.provider.jwt(id_claims, callback.expiry, issuer_url)?;
        let access_token = self
            .provider
            .jwt(access_claims.clone(), callback.expiry, issuer_url)?;

        let refresh_token = self.refresh_tokens.issue(RefreshContext {
            client_id: issued.request.client_id.clone(),
            subject: Some(subject),
            scope: issued.request.scope.clone(),
            claims: access_claims,
        })?;

        Ok(TokenResponse {
            id_token: Some(id_token),
            refresh_token: Some(refresh_token),
            scope: issued.request.scope,
            ..TokenResponse::bearer(access_token, callback.expires_in())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn auth_request(state: Option<&str>) -> AuthenticationRequest {
        AuthenticationRequest {
            client_id: "client1".to_owned(),
            redirect_uri: "http://localhost/callback".to_owned(),
            response_type: "code".to_owned(),
            scope: Some("openid".to_owned()),
            state: state.map(str::to_owned),
            nonce: Some("nonce123".to_owned()),
            prompt: None,
        }
    }

    fn grant() -> AuthorizationCodeGrant {
        AuthorizationCodeGrant::new(
            Arc::new(TokenProvider::new()),
            Arc::new(RefreshTokenManager::new()),
        )
    }

    #[test]
    fn redirect_url_carries_code_and_state() {
        let response = AuthorizationCodeResponse {
            code: "abc".to_owned(),
            state: Some("xyz 1".to_owned()),
        };

        assert_eq!(
            response.redirect_url("http://localhost/callback"),
            "http://localhost/callback?code=abc&state=xyz%201"
        );
        assert_eq!(
            response.redirect_url("http://localhost/callback?app=1"),
            "http://localhost/callback?app=1&code=abc&state=xyz%201"
        );
    }

    #[test]
    fn non_code_response_type_is_rejected() {
        let grant = grant();
        let mut request = auth_request(None);
        request.response_type = "token".to_owned();

        assert!(grant.authorization_code_response(request, None).is_err());
    }

    #[test]
    fn code_is_single_use() {
        let grant = grant();
        let issued = grant
            .authorization_code_response(auth_request(Some("s")), None)
            .expect("code issued");
        let issuer = Url::parse("http://localhost/default").expect("static url");
        let request = TokenRequest {
            grant_type: "authorization_code".to_owned(),
            code: Some(issued.code.clone()),
            ..TokenRequest::default()
        };
        let callback = TokenCallback::standard("default");

        let first = grant.token_response(&request, &issuer, &callback);
        assert!(first.is_ok());

        let second = grant.token_response(&request, &issuer, &callback);
        assert!(matches!(second, Err(HandlerError::TokenState(_))));
    }

    #[test]
    fn login_subject_flows_into_tokens_and_refresh_context() {
        let grant = grant();
        let issued = grant
            .authorization_code_response(
                auth_request(None),
                Some(Login {
                    username: "alice".to_owned(),
                }),
            )
            .expect("code issued");
        let issuer = Url::parse("http://localhost/default").expect("static url");
        let request = TokenRequest {
            grant_type: "authorization_code".to_owned(),
            code: Some(issued.code),
            ..TokenRequest::default()
        };

        let response = grant
            .token_response(&request, &issuer, &TokenCallback::standard("default"))
            .expect("token response");

        assert!(response.id_token.is_some());
        assert!(response.refresh_token.is_some());
        assert_eq!(response.scope.as_deref(), Some("openid"));
        assert_eq!(response.expires_in, 3600);
    }
}
