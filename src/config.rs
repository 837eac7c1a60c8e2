// ABOUTME: Server configuration loaded from environment variables or built in code
// ABOUTME: Controls the listen port, interactive login, and static token callbacks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use anyhow::{Context, Result};
use std::env;

use crate::token::callback::TokenCallback;

/// Environment variable naming the listen port (0 = ephemeral).
const ENV_PORT: &str = "MOCK_OAUTH2_SERVER_PORT";
/// Environment variable enabling the interactive login page.
const ENV_INTERACTIVE_LOGIN: &str = "MOCK_OAUTH2_SERVER_INTERACTIVE_LOGIN";

/// Server configuration.
///
/// Tests usually build this in code; the standalone binary loads it from the
/// environment via [`ServerConfig::from_env`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Listen port for the embedded server; 0 binds an ephemeral port
    pub port: u16,
    /// Render the login form on every authorization request instead of
    /// auto-issuing a code
    pub interactive_login: bool,
    /// Statically configured per-issuer token callbacks, consulted when the
    /// callback queue has no matching head
    pub token_callbacks: Vec<TokenCallback>,
}

impl ServerConfig {
    /// Configuration from `MOCK_OAUTH2_SERVER_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        let port = match env::var(ENV_PORT) {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("{ENV_PORT} must be a port number, got {raw:?}"))?,
            Err(_) => 0,
        };

        let interactive_login = match env::var(ENV_INTERACTIVE_LOGIN) {
            Ok(raw) => raw
                .parse::<bool>()
                .with_context(|| format!("{ENV_INTERACTIVE_LOGIN} must be true or false, got {raw:?}"))?,
            Err(_) => false,
        };

        Ok(Self {
            port,
            interactive_login,
            token_callbacks: Vec::new(),
        })
    }

    /// Enable or disable the interactive login page.
    #[must_use]
    pub fn with_interactive_login(mut self, interactive_login: bool) -> Self {
        self.interactive_login = interactive_login;
        self
    }

    /// Register a static token callback for its issuer.
    #[must_use]
    pub fn with_token_callback(mut self, callback: TokenCallback) -> Self {
        self.token_callbacks.push(callback);
        self
    }

    /// One-line summary for startup logging.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} interactive_login={} static_callbacks={}",
            self.port,
            self.interactive_login,
            self.token_callbacks.len()
        )
    }
}
