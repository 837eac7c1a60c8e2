// ABOUTME: Per-issuer token callbacks controlling claims and expiry of issued tokens
// ABOUTME: Thread-safe one-shot FIFO consumed by the token endpoint on issuer match
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::Duration;
use serde_json::{Map, Value};

/// Default token lifetime when a callback does not override it.
pub const DEFAULT_EXPIRY_SECONDS: i64 = 3600;

/// Audience used when no callback supplies one.
pub const DEFAULT_AUDIENCE: &str = "default";

/// Extra claims and expiry to apply to the next token issued for an issuer.
#[derive(Debug, Clone)]
pub struct TokenCallback {
    /// Issuer this callback applies to
    pub issuer_id: String,
    /// Claims merged into (and overriding) the grant handler's claims
    pub claims: Map<String, Value>,
    /// Lifetime of the issued token
    pub expiry: Duration,
}

impl TokenCallback {
    /// Empty callback for `issuer_id` with the default expiry.
    #[must_use]
    pub fn new(issuer_id: impl Into<String>) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            claims: Map::new(),
            expiry: Duration::seconds(DEFAULT_EXPIRY_SECONDS),
        }
    }

    /// Default callback for `issuer_id` carrying the baseline claims.
    #[must_use]
    pub fn standard(issuer_id: impl Into<String>) -> Self {
        Self::new(issuer_id).with_claim("aud", Value::String(DEFAULT_AUDIENCE.to_owned()))
    }

    /// Add one claim.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: Value) -> Self {
        self.claims.insert(key.into(), value);
        self
    }

    /// Override the token lifetime.
    #[must_use]
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Token lifetime in whole seconds, as reported in `expires_in`.
    #[must_use]
    pub fn expires_in(&self) -> i64 {
        self.expiry.num_seconds()
    }
}

/// Ordered, thread-safe FIFO of one-shot [`TokenCallback`] entries.
///
/// Test code enqueues; the token endpoint consumes the head only when its
/// issuer matches the requested one, otherwise the queue is left untouched.
/// Unmatched heads are never expired.
#[derive(Debug, Default)]
pub struct TokenCallbackQueue {
    inner: Mutex<VecDeque<TokenCallback>>,
}

impl TokenCallbackQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback; never blocks beyond the queue lock.
    pub fn enqueue(&self, callback: TokenCallback) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(callback);
    }

    /// Remove and return the head iff its issuer equals `issuer_id`.
    ///
    /// Peek and conditional removal happen under a single lock guard, so a
    /// concurrent enqueue cannot slip between them.
    #[must_use]
    pub fn dequeue_if_issuer(&self, issuer_id: &str) -> Option<TokenCallback> {
        let mut queue = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.front().is_some_and(|head| head.issuer_id == issuer_id) {
            queue.pop_front()
        } else {
            None
        }
    }

    /// Number of queued callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Is the queue empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
