// ABOUTME: Standalone mock OAuth2 server binary
// ABOUTME: Loads configuration from the environment, serves until ctrl-c
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

//! # Mock OAuth2 Server Binary
//!
//! Starts the mock authorization server with configuration from
//! `MOCK_OAUTH2_SERVER_*` environment variables, optionally overridden by
//! command-line flags.

use anyhow::Result;
use clap::Parser;
use mock_oauth2_server::{logging, MockOAuth2Server, ServerConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "mock-oauth2-server")]
#[command(about = "Mock OAuth2/OpenID-Connect authorization server for test environments")]
struct Args {
    /// Override the listen port (0 binds an ephemeral port)
    #[arg(long)]
    port: Option<u16>,

    /// Render the login form on every authorization request
    #[arg(long)]
    interactive_login: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.interactive_login {
        config.interactive_login = true;
    }

    info!("starting mock oauth2 server: {}", config.summary());
    let server = MockOAuth2Server::start(config).await?;
    info!(
        "default issuer discovery: {}/.well-known/openid-configuration",
        server.issuer_url("default")
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.shutdown().await;
    Ok(())
}
