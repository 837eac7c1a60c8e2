// ABOUTME: OAuth2 error taxonomy and exception-to-response mapping
// ABOUTME: Converts any handler failure into a spec-compliant OAuth2 JSON error response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

//! Unified error handling for the authorization server.
//!
//! Every failure raised while serving a request is a [`HandlerError`]. The
//! [`ExceptionMapper`] translates the closed set of error kinds into OAuth2
//! error bodies exhaustively, so adding a kind without a mapping is a compile
//! error.

use http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::http::OAuth2HttpResponse;

/// OAuth2 error code plus human description and the HTTP status it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorObject {
    /// OAuth2 error code (`invalid_request`, `invalid_grant`, ...)
    pub error: &'static str,
    /// Human-readable description
    pub description: String,
    /// HTTP status derived from the error code
    pub status: StatusCode,
}

impl ErrorObject {
    /// `invalid_request` (HTTP 400)
    #[must_use]
    pub fn invalid_request(description: &str) -> Self {
        Self {
            error: "invalid_request",
            description: description.to_owned(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// `invalid_grant` (HTTP 400)
    #[must_use]
    pub fn invalid_grant(description: &str) -> Self {
        Self {
            error: "invalid_grant",
            description: description.to_owned(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// `invalid_client` (HTTP 401)
    #[must_use]
    pub fn invalid_client() -> Self {
        Self {
            error: "invalid_client",
            description: "Client authentication failed".to_owned(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    /// `server_error` (HTTP 500)
    #[must_use]
    pub fn server_error(description: &str) -> Self {
        Self {
            error: "server_error",
            description: description.to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.description)
    }
}

/// Closed taxonomy of request-handling failures.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Domain-specific protocol violation carrying its own [`ErrorObject`]
    #[error("{0}")]
    Protocol(ErrorObject),

    /// Malformed authorization or token request. Carries an [`ErrorObject`]
    /// when the parser attached one, otherwise the raw parse message.
    #[error("{message}")]
    Parse {
        /// Error object attached by the parser, if any
        error: Option<ErrorObject>,
        /// Raw parse-failure message
        message: String,
    },

    /// Grant type absent from the dispatch table
    #[error("grant type not supported: {0}")]
    UnsupportedGrant(String),

    /// Expired or already-consumed authorization code or refresh token
    #[error("{0}")]
    TokenState(String),

    /// Malformed test-utility body or duration string; the message is
    /// returned verbatim as a plain-text 400 body
    #[error("{0}")]
    ClientInput(String),

    /// Anything else
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<ErrorObject> for HandlerError {
    fn from(error: ErrorObject) -> Self {
        Self::Protocol(error)
    }
}

impl HandlerError {
    /// Parse failure with an attached error object.
    #[must_use]
    pub fn parse(error: ErrorObject) -> Self {
        let message = error.description.clone();
        Self::Parse {
            error: Some(error),
            message,
        }
    }

    /// Parse failure with nothing but a message.
    #[must_use]
    pub fn parse_message(message: impl Into<String>) -> Self {
        Self::Parse {
            error: None,
            message: message.into(),
        }
    }
}

/// Translates any [`HandlerError`] into an OAuth2-compliant HTTP response.
pub struct ExceptionMapper;

impl ExceptionMapper {
    /// Build the error response for a failed request.
    ///
    /// The failure is logged with the originating request URL before the
    /// response is produced; nothing is silently swallowed.
    #[must_use]
    pub fn error_response(request_url: &Url, err: &HandlerError) -> OAuth2HttpResponse {
        error!(url = %request_url, error = %err, "request handling failed");

        let object = match err {
            HandlerError::Protocol(object) => object.clone(),
            HandlerError::Parse {
                error: Some(object),
                ..
            } => object.clone(),
            HandlerError::Parse {
                error: None,
                message,
            } => ErrorObject::invalid_request(&urlencoding::encode(message)),
            HandlerError::UnsupportedGrant(grant_type) => {
                ErrorObject::invalid_grant(&format!("grant_type {grant_type} not supported"))
            }
            HandlerError::TokenState(message) => ErrorObject::invalid_grant(message),
            HandlerError::ClientInput(message) => {
                return OAuth2HttpResponse::text(StatusCode::BAD_REQUEST, message);
            }
            HandlerError::Unexpected(cause) => {
                ErrorObject::server_error(&urlencoding::encode(&cause.to_string()))
            }
        };

        OAuth2HttpResponse::json_value(
            object.status,
            &json!({
                "error": object.error,
                "error_description": object.description,
            }),
        )
    }
}
