// ABOUTME: Framework-independent HTTP request/response types and the route table
// ABOUTME: Classifies incoming requests into endpoints via an immutable (method, pattern) table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

//! HTTP surface types.
//!
//! The server core is independent of any web framework: a router binding
//! converts its native request into an [`OAuth2HttpRequest`], hands it to
//! [`crate::handler::RequestHandler::handle`], and converts the returned
//! [`OAuth2HttpResponse`] back. Routes are matched by path suffix so each
//! issuer mounts the same endpoint set under its own prefix.

use std::collections::HashMap;

use http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, LOCATION,
};
use http::{Method, StatusCode};
use serde::Serialize;
use url::Url;

use crate::errors::HandlerError;
use crate::handler::RequestHandler;

/// An incoming HTTP request, reduced to what the endpoints need.
#[derive(Debug, Clone)]
pub struct OAuth2HttpRequest {
    /// Request method
    pub method: Method,
    /// Absolute request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Raw request body
    pub body: String,
}

impl OAuth2HttpRequest {
    /// Build a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    /// Attach a body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Query parameters as a map; repeated keys keep the last value.
    #[must_use]
    pub fn query_params(&self) -> HashMap<String, String> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Form-urlencoded body parameters as a map.
    #[must_use]
    pub fn form_params(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

/// An outgoing HTTP response.
#[derive(Debug, Clone)]
pub struct OAuth2HttpResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: String,
}

impl OAuth2HttpResponse {
    fn with_content_type(status: StatusCode, content_type: HeaderValue, body: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type);
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response from a serializable value.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Result<Self, HandlerError> {
        let body = serde_json::to_string(body).map_err(anyhow::Error::from)?;
        Ok(Self::with_content_type(
            status,
            HeaderValue::from_static("application/json"),
            body,
        ))
    }

    /// JSON response from an already-built `serde_json::Value`.
    #[must_use]
    pub fn json_value(status: StatusCode, body: &serde_json::Value) -> Self {
        Self::with_content_type(
            status,
            HeaderValue::from_static("application/json"),
            body.to_string(),
        )
    }

    /// Plain-text response.
    #[must_use]
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_content_type(
            status,
            HeaderValue::from_static("text/plain; charset=utf-8"),
            body.into(),
        )
    }

    /// HTML response with status 200.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::with_content_type(
            StatusCode::OK,
            HeaderValue::from_static("text/html; charset=utf-8"),
            body.into(),
        )
    }

    /// Empty response with the given status.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    /// 302 redirect to `location`.
    ///
    /// # Errors
    /// Returns an error if `location` is not a valid header value.
    pub fn redirect(location: &str) -> Result<Self, HandlerError> {
        let value = HeaderValue::from_str(location)
            .map_err(|e| anyhow::anyhow!("invalid redirect location {location}: {e}"))?;
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, value);
        Ok(Self {
            status: StatusCode::FOUND,
            headers,
            body: String::new(),
        })
    }

    /// 200 CORS preflight response with wildcard allow headers.
    #[must_use]
    pub fn preflight() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
        Self {
            status: StatusCode::OK,
            headers,
            body: String::new(),
        }
    }
}

/// Endpoint entry point: every route resolves to one of these.
pub type EndpointFn =
    fn(&RequestHandler, &OAuth2HttpRequest) -> Result<OAuth2HttpResponse, HandlerError>;

/// How a route's path pattern is matched against the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePattern {
    /// Full path match
    Exact(&'static str),
    /// Path ends with the suffix; whatever precedes it is the issuer id
    Suffix(&'static str),
    /// Any path
    Any,
}

impl RoutePattern {
    /// Does this pattern match the request path?
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == *exact,
            Self::Suffix(suffix) => path.ends_with(suffix),
            Self::Any => true,
        }
    }
}

/// One entry of the dispatch table: (methods, path pattern, handler function).
///
/// The table is built once at handler construction and never mutated; an
/// empty method list accepts every method.
pub struct Route {
    /// Accepted methods; empty means any
    pub methods: &'static [Method],
    /// Path pattern
    pub pattern: RoutePattern,
    /// Endpoint function
    pub endpoint: EndpointFn,
}

impl Route {
    /// Does this route accept the given method and path?
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        (self.methods.is_empty() || self.methods.contains(method)) && self.pattern.matches(path)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn suffix_pattern_respects_segment_boundary() {
        let pattern = RoutePattern::Suffix("/token");

        assert!(pattern.matches("/default/token"));
        assert!(pattern.matches("/token"));
        assert!(pattern.matches("/nested/issuer/token"));
        assert!(!pattern.matches("/mytoken"));
    }

    #[test]
    fn form_params_decode_urlencoding() {
        let url = Url::parse("http://localhost/default/token").expect("static url");
        let request = OAuth2HttpRequest::new(Method::POST, url)
            .with_body("grant_type=client_credentials&scope=a%20b");

        let form = request.form_params();
        assert_eq!(form.get("grant_type").map(String::as_str), Some("client_credentials"));
        assert_eq!(form.get("scope").map(String::as_str), Some("a b"));
    }

    #[test]
    fn preflight_carries_wildcard_cors_headers() {
        let response = OAuth2HttpResponse::preflight();

        assert_eq!(response.status, StatusCode::OK);
        for name in [
            ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_HEADERS,
        ] {
            assert_eq!(
                response.headers.get(&name).and_then(|v| v.to_str().ok()),
                Some("*")
            );
        }
    }
}
