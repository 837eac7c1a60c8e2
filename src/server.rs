// ABOUTME: Embedded tokio/axum server binding routing every request into the handler core
// ABOUTME: Binds an ephemeral or configured port and supports graceful shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

//! The router collaborator.
//!
//! The handler core is framework-independent; this binding converts axum
//! requests into [`OAuth2HttpRequest`]s, runs them through
//! [`RequestHandler::handle`], and converts the result back. A catch-all
//! fallback is used because the handler owns its own route table.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use http::header::HOST;
use http::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};
use url::Url;

use crate::config::ServerConfig;
use crate::handler::RequestHandler;
use crate::http::OAuth2HttpRequest;
use crate::token::callback::TokenCallback;

/// Largest accepted request body.
const BODY_LIMIT: usize = 1024 * 1024;

/// A running mock authorization server.
pub struct MockOAuth2Server {
    handler: Arc<RequestHandler>,
    base_url: Url,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl MockOAuth2Server {
    /// Bind `127.0.0.1:<config.port>` (0 = ephemeral) and start serving.
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound.
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let port = config.port;
        let handler = Arc::new(RequestHandler::new(config));

        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}/"))?;

        let app = Router::new()
            .fallback(dispatch)
            .with_state(Arc::clone(&handler));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                shutdown_rx.await.ok();
            });
            if let Err(e) = serve.await {
                error!(error = %e, "embedded server terminated");
            }
        });

        info!(%addr, "mock oauth2 server listening");
        Ok(Self {
            handler,
            base_url,
            addr,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// The bound socket address.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Server base URL.
    #[must_use]
    pub fn url(&self) -> Url {
        self.base_url.clone()
    }

    /// Issuer base URL for `issuer_id`.
    #[must_use]
    pub fn issuer_url(&self, issuer_id: &str) -> Url {
        let mut issuer_url = self.base_url.clone();
        issuer_url.set_path(issuer_id);
        issuer_url
    }

    /// The handler core, for direct (in-process) requests.
    #[must_use]
    pub fn handler(&self) -> &Arc<RequestHandler> {
        &self.handler
    }

    /// Queue a one-shot token callback for its issuer.
    pub fn enqueue_callback(&self, callback: TokenCallback) {
        self.handler.enqueue_token_callback(callback);
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "server task join failed");
        }
    }
}

async fn dispatch(State(handler): State<Arc<RequestHandler>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("failed to read request body: {e}"),
            )
                .into_response();
        }
    };

    let host = parts
        .headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("127.0.0.1");
    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", http::uri::PathAndQuery::as_str);
    let url = match Url::parse(&format!("http://{host}{path_and_query}")) {
        Ok(url) => url,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("invalid request URL: {e}")).into_response();
        }
    };

    let oauth_request = OAuth2HttpRequest {
        method: parts.method,
        url,
        headers: parts.headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    };

    let response = handler.handle(&oauth_request);
    (response.status, response.headers, response.body).into_response()
}
