// ABOUTME: Library entry point for the mock OAuth2/OIDC authorization server
// ABOUTME: Wires the request-dispatch core, grant handlers, and token collaborators
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

//! # Mock OAuth2 Server
//!
//! A mock OAuth2/OpenID-Connect authorization server for test environments.
//! It answers discovery, key-publishing, authorization, and token endpoints,
//! issues real RS256-signed JWTs, and lets tests pre-inject the claims and
//! expiry of the next issued token.
//!
//! ## Features
//!
//! - **Multiple issuers**: every endpoint set is mounted per issuer path
//! - **Five grant types**: `authorization_code`, `client_credentials`,
//!   JWT bearer, `refresh_token`, and token exchange
//! - **Token callbacks**: a thread-safe FIFO of one-shot per-issuer
//!   claims/expiry overrides, plus static per-issuer configuration
//! - **Test utilities**: full JWKS export and arbitrary-JWT signing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mock_oauth2_server::{MockOAuth2Server, ServerConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = MockOAuth2Server::start(ServerConfig::default()).await?;
//! let issuer = server.issuer_url("default");
//! println!("discovery: {issuer}/.well-known/openid-configuration");
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is persisted beyond the process lifetime and no real
//! authentication decisions are made: any submitted identity is accepted.

/// Server configuration
pub mod config;
/// Discovery metadata documents
pub mod discovery;
/// ISO-8601 duration parsing for test utilities
pub mod duration;
/// Error taxonomy and exception mapping
pub mod errors;
/// Grant types, handlers, and the dispatch table
pub mod grants;
/// The request-dispatch core
pub mod handler;
/// HTTP request/response types and the route table
pub mod http;
/// Interactive login form
pub mod login;
/// Tracing subscriber setup
pub mod logging;
/// Embedded axum server binding
pub mod server;
/// Token provider, callbacks, and refresh tokens
pub mod token;

pub use config::ServerConfig;
pub use errors::{ErrorObject, ExceptionMapper, HandlerError};
pub use grants::{GrantDispatchTable, GrantHandler, GrantType, TokenRequest, TokenResponse};
pub use handler::RequestHandler;
pub use http::{OAuth2HttpRequest, OAuth2HttpResponse};
pub use server::MockOAuth2Server;
pub use token::callback::{TokenCallback, TokenCallbackQueue};
pub use token::provider::{JsonWebKey, JsonWebKeySet, TokenProvider};
pub use token::refresh::{RefreshContext, RefreshTokenManager};
