// ABOUTME: Grant types, the GrantHandler contract, and the immutable dispatch table
// ABOUTME: Shared token request/response models and claim-assembly helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

//! Grant execution.
//!
//! Each supported grant type has exactly one handler implementing
//! [`GrantHandler`]; the [`GrantDispatchTable`] is built once at handler
//! construction and read-only afterwards, so adding a grant type never
//! touches dispatch logic.

/// `authorization_code` grant and authorization-code issuance
pub mod authorization_code;
/// `client_credentials` grant
pub mod client_credentials;
/// RFC 7523 JWT bearer grant
pub mod jwt_bearer;
/// `refresh_token` grant
pub mod refresh_token;
/// RFC 8693 token exchange grant
pub mod token_exchange;

pub use authorization_code::{
    AuthenticationRequest, AuthorizationCodeGrant, AuthorizationCodeResponse,
};
pub use client_credentials::ClientCredentialsGrant;
pub use jwt_bearer::JwtBearerGrant;
pub use refresh_token::RefreshTokenGrant;
pub use token_exchange::TokenExchangeGrant;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use http::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::errors::{ErrorObject, HandlerError};
use crate::http::OAuth2HttpRequest;
use crate::token::callback::TokenCallback;
use crate::token::provider::TokenProvider;
use crate::token::refresh::RefreshTokenManager;

/// The supported OAuth2 grant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// `authorization_code`
    AuthorizationCode,
    /// `client_credentials`
    ClientCredentials,
    /// `urn:ietf:params:oauth:grant-type:jwt-bearer`
    JwtBearer,
    /// `refresh_token`
    RefreshToken,
    /// `urn:ietf:params:oauth:grant-type:token-exchange`
    TokenExchange,
}

impl GrantType {
    /// Wire value of this grant type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
            Self::RefreshToken => "refresh_token",
            Self::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
        }
    }

    /// All supported grant types, in discovery-document order.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::AuthorizationCode,
            Self::ClientCredentials,
            Self::JwtBearer,
            Self::RefreshToken,
            Self::TokenExchange,
        ]
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrantType::all()
            .into_iter()
            .find(|grant_type| grant_type.as_str() == s)
            .ok_or_else(|| HandlerError::UnsupportedGrant(s.to_owned()))
    }
}

/// Parsed `POST /token` request.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    /// Raw `grant_type` value
    pub grant_type: String,
    /// Client id from Basic auth or the form body
    pub client_id: Option<String>,
    /// Client secret from Basic auth or the form body
    pub client_secret: Option<String>,
    /// Authorization code (`authorization_code`)
    pub code: Option<String>,
    /// Redirect URI (`authorization_code`)
    pub redirect_uri: Option<String>,
    /// Requested scope
    pub scope: Option<String>,
    /// Refresh token (`refresh_token`)
    pub refresh_token: Option<String>,
    /// Signed assertion (`jwt-bearer`)
    pub assertion: Option<String>,
    /// Subject token (`token-exchange`)
    pub subject_token: Option<String>,
    /// Requested audience (`token-exchange`)
    pub audience: Option<String>,
}

impl TokenRequest {
    /// Parse the form-encoded token request, preferring Basic-auth client
    /// credentials over form fields.
    ///
    /// # Errors
    /// Returns a parse failure if `grant_type` is missing.
    pub fn from_http(request: &OAuth2HttpRequest) -> Result<Self, HandlerError> {
        let form = request.form_params();

        let grant_type = form
            .get("grant_type")
            .cloned()
            .ok_or_else(|| {
                HandlerError::parse(ErrorObject::invalid_request("missing grant_type parameter"))
            })?;

        let (mut client_id, mut client_secret) = basic_auth(request);
        if client_id.is_none() {
            client_id = form.get("client_id").cloned();
            client_secret = form.get("client_secret").cloned();
        }

        Ok(Self {
            grant_type,
            client_id,
            client_secret,
            code: form.get("code").cloned(),
            redirect_uri: form.get("redirect_uri").cloned(),
            scope: form.get("scope").cloned(),
            refresh_token: form.get("refresh_token").cloned(),
            assertion: form.get("assertion").cloned(),
            subject_token: form.get("subject_token").cloned(),
            audience: form.get("audience").cloned(),
        })
    }

    /// Client id, or `invalid_client` when the request carries none.
    ///
    /// # Errors
    /// Returns `invalid_client` if the client did not authenticate.
    pub fn require_client_id(&self) -> Result<&str, HandlerError> {
        self.client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ErrorObject::invalid_client().into())
    }
}

fn basic_auth(request: &OAuth2HttpRequest) -> (Option<String>, Option<String>) {
    let Some(credentials) = request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|v| STANDARD.decode(v).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return (None, None);
    };
    match credentials.split_once(':') {
        Some((id, secret)) => (Some(id.to_owned()), Some(secret.to_owned())),
        None => (Some(credentials), None),
    }
}

/// JSON body of a successful token request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Always "Bearer"
    pub token_type: String,
    /// OIDC ID token, for grants that authenticate an end user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Signed access token
    pub access_token: String,
    /// Rotated or newly issued refresh token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    /// Granted scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// RFC 8693 issued token type, set by the token-exchange grant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_token_type: Option<String>,
}

impl TokenResponse {
    /// Bearer response around `access_token`.
    #[must_use]
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            token_type: "Bearer".to_owned(),
            id_token: None,
            access_token,
            refresh_token: None,
            expires_in,
            scope: None,
            issued_token_type: None,
        }
    }
}

/// Contract every grant strategy implements.
pub trait GrantHandler: Send + Sync {
    /// Execute the grant for `request`, issuing tokens for `issuer_url` with
    /// the claims/expiry of the resolved `callback`.
    ///
    /// # Errors
    /// Returns a protocol error for grant-specific violations (expired or
    /// used code, invalid refresh token, malformed assertion).
    fn token_response(
        &self,
        request: &TokenRequest,
        issuer_url: &Url,
        callback: &TokenCallback,
    ) -> Result<TokenResponse, HandlerError>;
}

/// Immutable grant-type → handler table.
pub struct GrantDispatchTable {
    handlers: HashMap<GrantType, Arc<dyn GrantHandler>>,
}

impl GrantDispatchTable {
    /// Build the table with the five built-in handlers.
    ///
    /// The authorization-code handler is returned separately as well because
    /// the authorize endpoint calls its code-issuance routine directly.
    #[must_use]
    pub fn builtin(
        provider: &Arc<TokenProvider>,
        refresh_tokens: &Arc<RefreshTokenManager>,
    ) -> (Self, Arc<AuthorizationCodeGrant>) {
        let authorization_code = Arc::new(AuthorizationCodeGrant::new(
            Arc::clone(provider),
            Arc::clone(refresh_tokens),
        ));

        let mut handlers: HashMap<GrantType, Arc<dyn GrantHandler>> = HashMap::new();
        handlers.insert(
            GrantType::AuthorizationCode,
            Arc::clone(&authorization_code) as Arc<dyn GrantHandler>,
        );
        handlers.insert(
            GrantType::ClientCredentials,
            Arc::new(ClientCredentialsGrant::new(Arc::clone(provider))),
        );
        handlers.insert(
            GrantType::JwtBearer,
            Arc::new(JwtBearerGrant::new(Arc::clone(provider))),
        );
        handlers.insert(
            GrantType::RefreshToken,
            Arc::new(RefreshTokenGrant::new(
                Arc::clone(provider),
                Arc::clone(refresh_tokens),
            )),
        );
        handlers.insert(
            GrantType::TokenExchange,
            Arc::new(TokenExchangeGrant::new(Arc::clone(provider))),
        );

        (Self { handlers }, authorization_code)
    }

    /// Handler for `grant_type`, if one is registered.
    #[must_use]
    pub fn lookup(&self, grant_type: GrantType) -> Option<&Arc<dyn GrantHandler>> {
        self.handlers.get(&grant_type)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Is the table empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Registered JWT claims never copied from an incoming assertion.
const REGISTERED_CLAIMS: [&str; 6] = ["iss", "iat", "exp", "nbf", "jti", "aud"];

/// Merge the callback's claims over `claims`; injected overrides always win.
pub(crate) fn apply_callback_claims(
    mut claims: Map<String, Value>,
    callback: &TokenCallback,
) -> Map<String, Value> {
    for (key, value) in &callback.claims {
        claims.insert(key.clone(), value.clone());
    }
    claims
}

/// Decode a compact JWT's payload without verifying its signature.
///
/// The mock server mints its own keys, so an incoming assertion can never be
/// signature-checked against them; the payload is trusted as-is. Registered
/// claims are dropped so the reissued token gets fresh ones.
pub(crate) fn decode_unverified_claims(
    token: &str,
    parameter: &str,
) -> Result<Map<String, Value>, HandlerError> {
    let malformed = |detail: &str| {
        HandlerError::Protocol(ErrorObject::invalid_grant(&format!(
            "malformed {parameter}: {detail}"
        )))
    };

    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| malformed("expected a compact JWT with three segments"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| malformed(&format!("payload is not base64url: {e}")))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| malformed(&format!("payload is not JSON: {e}")))?;
    let mut claims = value
        .as_object()
        .cloned()
        .ok_or_else(|| malformed("payload is not a JSON object"))?;

    for registered in REGISTERED_CLAIMS {
        claims.remove(registered);
    }
    Ok(claims)
}
