// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock call gateway for deterministic testing.
//!
//! `MockGateway` implements [`CallGateway`] with pre-configured responses,
//! enabling pipeline tests without external API calls. Responses are popped
//! from a FIFO queue; when the queue is empty, a default classification
//! payload is returned.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tollgate_core::types::{ClassificationOutcome, GatewayRequest, GatewayResponse};
use tollgate_core::{CallGateway, TollgateError};

enum Scripted {
    Respond(GatewayResponse),
    Fail(String),
}

/// A mock call gateway that returns pre-configured responses.
pub struct MockGateway {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    invocations: AtomicU64,
}

impl MockGateway {
    /// Create a mock gateway with an empty script.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            invocations: AtomicU64::new(0),
        }
    }

    /// Queue a successful response.
    pub async fn push_response(&self, response: GatewayResponse) {
        self.script.lock().await.push_back(Scripted::Respond(response));
    }

    /// Queue a successful response carrying `outcome` as its JSON text.
    pub async fn push_outcome(&self, outcome: &ClassificationOutcome, tokens_used: u64) {
        let text = serde_json::to_string(outcome).expect("outcome serializes");
        self.push_response(GatewayResponse { text, tokens_used }).await;
    }

    /// Queue a gateway failure.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.script.lock().await.push_back(Scripted::Fail(message.into()));
    }

    /// Number of `invoke` calls observed so far.
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }

    fn default_response() -> GatewayResponse {
        let outcome = ClassificationOutcome {
            classification: "uncategorized".to_string(),
            confidence: 0.5,
            reasoning: "mock default".to_string(),
        };
        GatewayResponse {
            text: serde_json::to_string(&outcome).expect("outcome serializes"),
            tokens_used: 10,
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallGateway for MockGateway {
    async fn invoke(&self, _request: &GatewayRequest) -> Result<GatewayResponse, TollgateError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().await.pop_front() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(TollgateError::Gateway {
                message,
                source: None,
            }),
            None => Ok(Self::default_response()),
        }
    }
}
