// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock language-model backend for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with a scripted queue of
//! outcomes and records every request it receives.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chatrelay_core::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, PluginAdapter,
    ProviderAdapter, RelayError, TokenUsage,
};
use tokio::sync::Mutex;

/// One scripted result of a `complete` call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Successful completion with this content.
    Reply(String),
    /// Backend rejection, reported as [`RelayError::Provider`].
    Error(String),
    /// Reported as [`RelayError::Timeout`] without waiting.
    Timeout,
    /// Never answers within the request deadline; the caller's timer must fire.
    Hang,
}

/// A mock provider that pops outcomes from a FIFO queue.
///
/// When the queue is empty, a default "mock response" text is returned.
pub struct MockProvider {
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider pre-loaded with successful replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::with_outcomes(responses.into_iter().map(MockOutcome::Reply).collect())
    }

    pub fn with_outcomes(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::from(outcomes))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider that fails every call.
    pub fn always_failing() -> Self {
        Self::with_outcomes(vec![MockOutcome::Error("backend down".into()); 64])
    }

    pub async fn push_outcome(&self, outcome: MockOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, RelayError> {
        let timeout = request.timeout;
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        let outcome = self
            .outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockOutcome::Reply("mock response".to_string()));

        match outcome {
            MockOutcome::Reply(content) => Ok(CompletionResponse {
                id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
                content,
                model,
                finish_reason: Some("stop".to_string()),
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 20,
                },
            }),
            MockOutcome::Error(message) => Err(RelayError::Provider {
                message,
                source: None,
            }),
            MockOutcome::Timeout => Err(RelayError::Timeout { duration: timeout }),
            MockOutcome::Hang => {
                tokio::time::sleep(timeout * 4).await;
                Err(RelayError::Timeout { duration: timeout })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use chatrelay_core::ChatMessage;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-test".into(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 10,
            temperature: 0.7,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn scripted_outcomes_in_order() {
        let provider = MockProvider::with_outcomes(vec![
            MockOutcome::Error("boom".into()),
            MockOutcome::Timeout,
            MockOutcome::Reply("third".into()),
        ]);
        assert!(matches!(
            provider.complete(request()).await,
            Err(RelayError::Provider { .. })
        ));
        assert!(provider.complete(request()).await.unwrap_err().is_timeout());
        assert_eq!(provider.complete(request()).await.unwrap().content, "third");
        assert_eq!(provider.complete(request()).await.unwrap().content, "mock response");
        assert_eq!(provider.call_count().await, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn hang_outlasts_the_deadline() {
        let provider = MockProvider::with_outcomes(vec![MockOutcome::Hang]);
        let result =
            tokio::time::timeout(Duration::from_secs(2), provider.complete(request())).await;
        assert!(result.is_err());
    }
}
