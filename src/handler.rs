// ABOUTME: The request-dispatch core: routes every request to its OAuth2 endpoint
// ABOUTME: Wires grant dispatch, callback resolution, discovery, JWKS, and test utilities
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

//! The request handler.
//!
//! One [`RequestHandler`] instance serves all concurrent connections. Its
//! route table is built once at construction; request handling is synchronous
//! end-to-end, and any failure is translated by the
//! [`ExceptionMapper`](crate::errors::ExceptionMapper) before a response
//! leaves this module.

use std::sync::Arc;

use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use url::Url;

use crate::config::ServerConfig;
use crate::discovery::WellKnownConfiguration;
use crate::duration::parse_duration;
use crate::errors::{ExceptionMapper, HandlerError};
use crate::grants::{
    AuthenticationRequest, AuthorizationCodeGrant, GrantDispatchTable, GrantType, TokenRequest,
};
use crate::http::{OAuth2HttpRequest, OAuth2HttpResponse, Route, RoutePattern};
use crate::login::{self, Login};
use crate::token::callback::{TokenCallback, TokenCallbackQueue};
use crate::token::provider::TokenProvider;
use crate::token::refresh::RefreshTokenManager;

const WELL_KNOWN_OIDC: &str = "/.well-known/openid-configuration";
const WELL_KNOWN_OAUTH: &str = "/.well-known/oauth-authorization-server";
const JWKS: &str = "/jwks";
const AUTHORIZE: &str = "/authorize";
const END_SESSION: &str = "/endsession";
const TOKEN: &str = "/token";
const TESTUTILS_JWKS: &str = "/testutils/jwks";
const TESTUTILS_TOKEN: &str = "/testutils/token";

/// Inline examples appended to malformed-duration messages.
const DURATION_EXAMPLES: &str =
    r#""P1D" = 1 day, "PT1H" = 1 hour, "P0DT0H10M30S" = 10 min 30 sec"#;

/// Serves every OAuth2 endpoint for every issuer mounted under it.
pub struct RequestHandler {
    interactive_login: bool,
    static_callbacks: Vec<TokenCallback>,
    provider: Arc<TokenProvider>,
    callback_queue: TokenCallbackQueue,
    grants: GrantDispatchTable,
    authorization_code: Arc<AuthorizationCodeGrant>,
    routes: Vec<Route>,
}

impl RequestHandler {
    /// Build the handler and its immutable route and grant tables.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let provider = Arc::new(TokenProvider::new());
        let refresh_tokens = Arc::new(RefreshTokenManager::new());
        let (grants, authorization_code) = GrantDispatchTable::builtin(&provider, &refresh_tokens);

        Self {
            interactive_login: config.interactive_login,
            static_callbacks: config.token_callbacks,
            provider,
            callback_queue: TokenCallbackQueue::new(),
            grants,
            authorization_code,
            routes: build_routes(),
        }
    }

    /// The immutable route table, for router bindings that want to inspect it.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The token provider backing this handler.
    #[must_use]
    pub fn token_provider(&self) -> &Arc<TokenProvider> {
        &self.provider
    }

    /// Append a one-shot token callback; the test-facing injection point.
    pub fn enqueue_token_callback(&self, callback: TokenCallback) {
        self.callback_queue.enqueue(callback);
    }

    /// Handle one request, mapping any failure to an OAuth2 error response.
    #[must_use]
    pub fn handle(&self, request: &OAuth2HttpRequest) -> OAuth2HttpResponse {
        let path = request.url.path().to_owned();
        let Some(route) = self
            .routes
            .iter()
            .find(|route| route.matches(&request.method, &path))
        else {
            warn!(method = %request.method, path = %path, "no matching route");
            return OAuth2HttpResponse::text(StatusCode::NOT_FOUND, "no matching route");
        };

        (route.endpoint)(self, request)
            .unwrap_or_else(|err| ExceptionMapper::error_response(&request.url, &err))
    }

    /// Resolve the token callback for `issuer_id`.
    ///
    /// The queue head is consulted first and consumed only on issuer match;
    /// otherwise the first static callback for the issuer applies, and
    /// failing that a default callback with baseline claims.
    #[must_use]
    pub fn resolve_token_callback(&self, issuer_id: &str) -> TokenCallback {
        if let Some(head) = self.callback_queue.dequeue_if_issuer(issuer_id) {
            return head;
        }
        if let Some(configured) = self
            .static_callbacks
            .iter()
            .find(|callback| callback.issuer_id == issuer_id)
        {
            return configured.clone();
        }
        TokenCallback::standard(issuer_id)
    }
}

/// Issuer id: the request path with the endpoint suffix stripped.
fn issuer_id(path: &str, suffix: &str) -> String {
    path.strip_suffix(suffix)
        .unwrap_or("")
        .trim_matches('/')
        .to_owned()
}

/// Issuer base URL: request origin plus the issuer id.
fn issuer_url_from(request_url: &Url, issuer_id: &str) -> Url {
    let mut issuer_url = request_url.clone();
    issuer_url.set_path(issuer_id);
    issuer_url.set_query(None);
    issuer_url.set_fragment(None);
    issuer_url
}

fn build_routes() -> Vec<Route> {
    // First match wins: longer suffixes are registered before their tails
    // so `/testutils/token` never falls through to `/token`.
    vec![
        Route {
            methods: &[Method::OPTIONS],
            pattern: RoutePattern::Any,
            endpoint: preflight,
        },
        Route {
            methods: &[Method::GET],
            pattern: RoutePattern::Exact("/favicon.ico"),
            endpoint: favicon,
        },
        Route {
            methods: &[Method::GET],
            pattern: RoutePattern::Suffix(WELL_KNOWN_OIDC),
            endpoint: well_known,
        },
        Route {
            methods: &[Method::GET],
            pattern: RoutePattern::Suffix(WELL_KNOWN_OAUTH),
            endpoint: well_known,
        },
        Route {
            methods: &[Method::GET],
            pattern: RoutePattern::Suffix(TESTUTILS_JWKS),
            endpoint: testutils_jwks,
        },
        Route {
            methods: &[Method::POST],
            pattern: RoutePattern::Suffix(TESTUTILS_TOKEN),
            endpoint: testutils_token,
        },
        Route {
            methods: &[Method::GET],
            pattern: RoutePattern::Suffix(JWKS),
            endpoint: jwks,
        },
        Route {
            methods: &[Method::GET, Method::POST],
            pattern: RoutePattern::Suffix(AUTHORIZE),
            endpoint: authorization,
        },
        Route {
            methods: &[],
            pattern: RoutePattern::Suffix(END_SESSION),
            endpoint: end_session,
        },
        Route {
            methods: &[Method::GET, Method::POST],
            pattern: RoutePattern::Suffix(TOKEN),
            endpoint: token,
        },
    ]
}

fn well_known(
    _handler: &RequestHandler,
    request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    let path = request.url.path();
    let issuer = path
        .strip_suffix(WELL_KNOWN_OIDC)
        .or_else(|| path.strip_suffix(WELL_KNOWN_OAUTH))
        .unwrap_or("")
        .trim_matches('/');
    let issuer_url = issuer_url_from(&request.url, issuer);
    OAuth2HttpResponse::json(StatusCode::OK, &WellKnownConfiguration::for_issuer(&issuer_url))
}

fn jwks(
    handler: &RequestHandler,
    request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    let issuer = issuer_id(request.url.path(), JWKS);
    let key_set = handler.provider.public_jwk_set(&issuer)?;
    OAuth2HttpResponse::json(StatusCode::OK, &key_set)
}

fn authorization(
    handler: &RequestHandler,
    request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    let auth_request = AuthenticationRequest::from_query(&request.query_params())?;

    if request.method == Method::POST {
        let submitted = Login::from_form(&request.form_params())?;
        return code_redirect(handler, auth_request, Some(submitted));
    }

    if handler.interactive_login || auth_request.wants_interactive_login() {
        return Ok(OAuth2HttpResponse::html(login::render_login_form(
            &request.url,
            &auth_request,
        )));
    }
    code_redirect(handler, auth_request, None)
}

fn code_redirect(
    handler: &RequestHandler,
    auth_request: AuthenticationRequest,
    submitted: Option<Login>,
) -> Result<OAuth2HttpResponse, HandlerError> {
    let redirect_uri = auth_request.redirect_uri.clone();
    let code_response = handler
        .authorization_code
        .authorization_code_response(auth_request, submitted)?;
    OAuth2HttpResponse::redirect(&code_response.redirect_url(&redirect_uri))
}

fn end_session(
    _handler: &RequestHandler,
    request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    match request.query_params().get("post_logout_redirect_uri") {
        Some(target) => OAuth2HttpResponse::redirect(target),
        None => Ok(OAuth2HttpResponse::html(
            "<!DOCTYPE html><html><body><h1>Logged out</h1></body></html>",
        )),
    }
}

fn token(
    handler: &RequestHandler,
    request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    if request.method == Method::GET {
        return Ok(OAuth2HttpResponse::text(
            StatusCode::METHOD_NOT_ALLOWED,
            "unsupported method",
        ));
    }

    let token_request = TokenRequest::from_http(request)?;
    let issuer = issuer_id(request.url.path(), TOKEN);
    let callback = handler.resolve_token_callback(&issuer);

    let grant_type: GrantType = token_request.grant_type.parse()?;
    let grant = handler
        .grants
        .lookup(grant_type)
        .ok_or_else(|| HandlerError::UnsupportedGrant(token_request.grant_type.clone()))?;

    let issuer_url = issuer_url_from(&request.url, &issuer);
    let response = grant.token_response(&token_request, &issuer_url, &callback)?;
    info!(issuer = %issuer_url, %grant_type, "token issued");
    OAuth2HttpResponse::json(StatusCode::OK, &response)
}

fn preflight(
    _handler: &RequestHandler,
    _request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    Ok(OAuth2HttpResponse::preflight())
}

fn favicon(
    _handler: &RequestHandler,
    _request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    Ok(OAuth2HttpResponse::empty(StatusCode::OK))
}

fn testutils_jwks(
    handler: &RequestHandler,
    request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    let issuer = issuer_id(request.url.path(), TESTUTILS_JWKS);
    let key_set = handler.provider.full_jwk_set(&issuer)?;
    OAuth2HttpResponse::json(StatusCode::OK, &key_set)
}

/// Body of `POST …/testutils/token`.
#[derive(Debug, Default, Deserialize)]
struct TestTokenRequest {
    claims: Option<Map<String, Value>>,
    expiry: Option<String>,
}

fn testutils_token(
    handler: &RequestHandler,
    request: &OAuth2HttpRequest,
) -> Result<OAuth2HttpResponse, HandlerError> {
    let body = request.body.trim();
    let test_request: TestTokenRequest = if body.is_empty() {
        TestTokenRequest::default()
    } else {
        serde_json::from_str(body).map_err(|e| HandlerError::ClientInput(e.to_string()))?
    };

    // Claim values are stringified before inclusion.
    let claims: Map<String, Value> = test_request
        .claims
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, Value::String(value))
        })
        .collect();

    let raw_expiry = test_request.expiry.unwrap_or_else(|| "PT1H".to_owned());
    let expiry = parse_duration(&raw_expiry).map_err(|e| {
        HandlerError::ClientInput(format!("{e}: '{raw_expiry}' (examples: {DURATION_EXAMPLES})"))
    })?;

    let issuer = issuer_id(request.url.path(), TESTUTILS_TOKEN);
    let issuer_url = issuer_url_from(&request.url, &issuer);
    let jwt = handler.provider.jwt(claims, expiry, &issuer_url)?;
    Ok(OAuth2HttpResponse::text(StatusCode::OK, jwt))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn issuer_id_strips_suffix_and_slashes() {
        assert_eq!(issuer_id("/default/token", TOKEN), "default");
        assert_eq!(issuer_id("/token", TOKEN), "");
        assert_eq!(issuer_id("/a/b/token", TOKEN), "a/b");
    }

    #[test]
    fn issuer_url_keeps_origin_only() {
        let request_url =
            Url::parse("http://localhost:8080/default/token?grant_type=x#frag").expect("url");
        let issuer_url = issuer_url_from(&request_url, "default");
        assert_eq!(issuer_url.as_str(), "http://localhost:8080/default");
    }

    #[test]
    fn callback_resolution_prefers_queue_then_static_then_default() {
        let config = ServerConfig::default().with_token_callback(
            TokenCallback::new("default").with_claim("src", Value::String("static".to_owned())),
        );
        let handler = RequestHandler::new(config);
        handler.enqueue_token_callback(
            TokenCallback::new("default").with_claim("src", Value::String("queued".to_owned())),
        );

        let first = handler.resolve_token_callback("default");
        assert_eq!(first.claims.get("src").and_then(Value::as_str), Some("queued"));

        let second = handler.resolve_token_callback("default");
        assert_eq!(second.claims.get("src").and_then(Value::as_str), Some("static"));

        let other = handler.resolve_token_callback("other");
        assert!(other.claims.contains_key("aud"));
    }

    #[test]
    fn queued_callback_for_other_issuer_is_left_in_place() {
        let handler = RequestHandler::new(ServerConfig::default());
        handler.enqueue_token_callback(TokenCallback::new("issuer1"));

        let resolved = handler.resolve_token_callback("issuer2");
        assert_eq!(resolved.issuer_id, "issuer2");

        // The unmatched head is still first in line for its own issuer.
        let head = handler.resolve_token_callback("issuer1");
        assert!(head.claims.is_empty());
    }
}
