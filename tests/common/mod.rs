// ABOUTME: Shared test utilities for integration tests
// ABOUTME: Request builders and JWT/JSON decoding helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors
#![allow(dead_code, clippy::missing_panics_doc, clippy::must_use_candidate)]

//! Shared test utilities for `mock_oauth2_server` integration tests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use mock_oauth2_server::{OAuth2HttpRequest, OAuth2HttpResponse, RequestHandler, ServerConfig};
use serde_json::{Map, Value};
use url::Url;

/// Handler with the default configuration.
pub fn handler() -> RequestHandler {
    RequestHandler::new(ServerConfig::default())
}

/// Absolute URL on the test host.
pub fn url(path_and_query: &str) -> Url {
    Url::parse(&format!("http://localhost:8080{path_and_query}")).expect("test url")
}

/// GET request.
pub fn get(path_and_query: &str) -> OAuth2HttpRequest {
    OAuth2HttpRequest::new(Method::GET, url(path_and_query))
}

/// POST request with a form-encoded body.
pub fn post_form(path: &str, params: &[(&str, &str)]) -> OAuth2HttpRequest {
    let body = serde_urlencoded::to_string(params).expect("form body");
    let mut request = OAuth2HttpRequest::new(Method::POST, url(path)).with_body(body);
    request.headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    request
}

/// POST request with a JSON body.
pub fn post_json(path: &str, body: &Value) -> OAuth2HttpRequest {
    let mut request = OAuth2HttpRequest::new(Method::POST, url(path)).with_body(body.to_string());
    request
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    request
}

/// Decode a compact JWT's payload without verifying the signature.
pub fn decode_claims(jwt: &str) -> Map<String, Value> {
    let payload = jwt.split('.').nth(1).expect("three JWT segments");
    let bytes = URL_SAFE_NO_PAD.decode(payload).expect("base64url payload");
    serde_json::from_slice::<Value>(&bytes)
        .expect("JSON payload")
        .as_object()
        .cloned()
        .expect("object payload")
}

/// Parse a response body as JSON.
pub fn json_body(response: &OAuth2HttpResponse) -> Value {
    serde_json::from_str(&response.body).expect("JSON response body")
}

/// The `error` field of an OAuth2 JSON error body.
pub fn error_code(response: &OAuth2HttpResponse) -> String {
    json_body(response)
        .get("error")
        .and_then(Value::as_str)
        .expect("error field")
        .to_owned()
}

/// The `code` query parameter of a redirect response's Location header.
pub fn code_from_redirect(response: &OAuth2HttpResponse) -> String {
    let location = response
        .headers
        .get(http::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("Location header");
    let redirect = Url::parse(location).expect("redirect URL");
    redirect
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .expect("code parameter")
}
