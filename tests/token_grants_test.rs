// ABOUTME: Token-endpoint tests covering all five grant types end to end
// ABOUTME: Exercises code redemption, refresh rotation and replay, and assertion-based grants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use common::{code_from_redirect, decode_claims, error_code, get, handler, post_form};
use http::StatusCode;
use mock_oauth2_server::TokenResponse;
use serde_json::Value;

fn token_response(body: &str) -> TokenResponse {
    serde_json::from_str(body).expect("token response body")
}

// =============================================================================
// Grant dispatch
// =============================================================================

#[test]
fn unknown_grant_type_is_invalid_grant() {
    let handler = handler();

    for grant_type in ["password", "implicit", "device_code", "gibberish"] {
        let response = handler.handle(&post_form(
            "/default/token",
            &[("grant_type", grant_type), ("client_id", "client1")],
        ));

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&response), "invalid_grant");
    }
}

// =============================================================================
// client_credentials
// =============================================================================

#[test]
fn client_credentials_issues_a_token_for_the_client() {
    let handler = handler();

    let response = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "client_credentials"),
            ("client_id", "machine-1"),
            ("client_secret", "s3cret"),
            ("scope", "read"),
        ],
    ));

    assert_eq!(response.status, StatusCode::OK);
    let token = token_response(&response.body);
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, 3600);
    assert_eq!(token.scope.as_deref(), Some("read"));
    assert!(token.refresh_token.is_none());

    let claims = decode_claims(&token.access_token);
    assert_eq!(claims.get("sub").and_then(Value::as_str), Some("machine-1"));
    assert_eq!(claims.get("aud").and_then(Value::as_str), Some("default"));
    assert_eq!(
        claims.get("iss").and_then(Value::as_str),
        Some("http://localhost:8080/default")
    );
}

#[test]
fn client_credentials_without_client_is_invalid_client() {
    let handler = handler();

    let response = handler.handle(&post_form(
        "/default/token",
        &[("grant_type", "client_credentials")],
    ));

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&response), "invalid_client");
}

// =============================================================================
// authorization_code + refresh_token lifecycle
// =============================================================================

#[test]
fn authorization_code_flow_issues_and_rotates_tokens() {
    let handler = handler();

    // 1. Authorization request issues a code via redirect.
    let authorize = handler.handle(&get(
        "/default/authorize?client_id=client1&redirect_uri=http%3A%2F%2Flocalhost%2Fcb&response_type=code&scope=openid&nonce=n-1&state=s-1",
    ));
    assert_eq!(authorize.status, StatusCode::FOUND);
    let code = code_from_redirect(&authorize);

    // 2. The code is redeemed for tokens.
    let exchange = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "authorization_code"),
            ("client_id", "client1"),
            ("code", &code),
        ],
    ));
    assert_eq!(exchange.status, StatusCode::OK);
    let token = token_response(&exchange.body);
    assert_eq!(token.scope.as_deref(), Some("openid"));

    let id_token = token.id_token.expect("id_token");
    let id_claims = decode_claims(&id_token);
    assert_eq!(id_claims.get("aud").and_then(Value::as_str), Some("client1"));
    assert_eq!(id_claims.get("nonce").and_then(Value::as_str), Some("n-1"));

    // 3. The same code cannot be redeemed twice.
    let replay = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "authorization_code"),
            ("client_id", "client1"),
            ("code", &code),
        ],
    ));
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&replay), "invalid_grant");

    // 4. The refresh token redeems once and is rotated.
    let refresh_token = token.refresh_token.expect("refresh token");
    let refreshed = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
        ],
    ));
    assert_eq!(refreshed.status, StatusCode::OK);
    let refreshed = token_response(&refreshed.body);
    let rotated = refreshed.refresh_token.expect("rotated refresh token");
    assert_ne!(rotated, refresh_token);

    let subject = decode_claims(&token.access_token)
        .get("sub")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .expect("subject");
    assert_eq!(
        decode_claims(&refreshed.access_token)
            .get("sub")
            .and_then(Value::as_str),
        Some(subject.as_str())
    );

    // 5. Replaying the consumed refresh token fails.
    let replayed_refresh = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
        ],
    ));
    assert_eq!(replayed_refresh.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&replayed_refresh), "invalid_grant");
}

#[test]
fn unknown_authorization_code_is_invalid_grant() {
    let handler = handler();

    let response = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "authorization_code"),
            ("client_id", "client1"),
            ("code", "no-such-code"),
        ],
    ));

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "invalid_grant");
}

#[test]
fn unknown_refresh_token_is_invalid_grant() {
    let handler = handler();

    let response = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", "no-such-token"),
        ],
    ));

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "invalid_grant");
}

// =============================================================================
// jwt-bearer + token-exchange
// =============================================================================

fn unsigned_jwt(payload: &Value) -> String {
    format!(
        "eyJhbGciOiJub25lIn0.{}.signature",
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

#[test]
fn jwt_bearer_reissues_assertion_claims_under_this_issuer() {
    let handler = handler();
    let assertion = unsigned_jwt(&serde_json::json!({
        "iss": "upstream",
        "sub": "alice",
        "role": "admin",
        "exp": 1,
    }));

    let response = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", &assertion),
        ],
    ));

    assert_eq!(response.status, StatusCode::OK);
    let token = token_response(&response.body);
    let claims = decode_claims(&token.access_token);

    assert_eq!(claims.get("sub").and_then(Value::as_str), Some("alice"));
    assert_eq!(claims.get("role").and_then(Value::as_str), Some("admin"));
    // Registered claims come from this issuer, not the assertion.
    assert_eq!(
        claims.get("iss").and_then(Value::as_str),
        Some("http://localhost:8080/default")
    );
    let exp = claims.get("exp").and_then(Value::as_i64).unwrap();
    assert!(exp > 1);
}

#[test]
fn jwt_bearer_with_malformed_assertion_is_invalid_grant() {
    let handler = handler();

    let response = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", "not-a-jwt"),
        ],
    ));

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "invalid_grant");
}

#[test]
fn token_exchange_sets_the_requested_audience() {
    let handler = handler();
    let subject_token = unsigned_jwt(&serde_json::json!({ "sub": "alice" }));

    let response = handler.handle(&post_form(
        "/default/token",
        &[
            ("grant_type", "urn:ietf:params:oauth:grant-type:token-exchange"),
            ("subject_token", &subject_token),
            ("audience", "target-api"),
        ],
    ));

    assert_eq!(response.status, StatusCode::OK);
    let token = token_response(&response.body);
    assert_eq!(
        token.issued_token_type.as_deref(),
        Some("urn:ietf:params:oauth:token-type:access_token")
    );

    let claims = decode_claims(&token.access_token);
    assert_eq!(claims.get("aud").and_then(Value::as_str), Some("target-api"));
    assert_eq!(claims.get("sub").and_then(Value::as_str), Some("alice"));
}

// =============================================================================
// Issuer isolation
// =============================================================================

#[test]
fn nested_issuer_paths_get_their_own_issuer_url() {
    let handler = handler();

    let response = handler.handle(&post_form(
        "/tenant/a/token",
        &[
            ("grant_type", "client_credentials"),
            ("client_id", "machine-1"),
        ],
    ));

    assert_eq!(response.status, StatusCode::OK);
    let token = token_response(&response.body);
    let claims = decode_claims(&token.access_token);
    assert_eq!(
        claims.get("iss").and_then(Value::as_str),
        Some("http://localhost:8080/tenant/a")
    );
}
