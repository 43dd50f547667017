// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation through a one-shot language-model call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatrelay_config::model::OpenAiConfig;
use chatrelay_core::{ChatMessage, CompletionRequest, ProviderAdapter, RelayError, Translator};
use tracing::debug;

/// [`Translator`] that asks the configured backend for a translation.
pub struct ProviderTranslator {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl ProviderTranslator {
    pub fn new(provider: Arc<dyn ProviderAdapter>, config: &OpenAiConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: config.request_timeout(),
        }
    }
}

#[async_trait]
impl Translator for ProviderTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, RelayError> {
        debug!(target_language, "translating message");
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(format!(
                    "Translate the user's message into the language with code '{target_language}'. \
                     Reply with the translation only."
                )),
                ChatMessage::user(text),
            ],
            max_tokens: self.max_tokens,
            temperature: 0.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            timeout: self.timeout,
        };

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| RelayError::Timeout {
                duration: self.timeout,
            })?
            .map_err(|e| RelayError::Lookup {
                message: format!("translation failed: {e}"),
            })?;
        let translated = response.content.trim();
        if translated.is_empty() {
            return Err(RelayError::Lookup {
                message: "backend returned an empty translation".into(),
            });
        }
        Ok(translated.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::Role;
    use chatrelay_test_utils::{MockOutcome, MockProvider};

    #[tokio::test]
    async fn sends_one_shot_prompt() {
        let provider = Arc::new(MockProvider::with_responses(vec!["  hello  ".into()]));
        let translator = ProviderTranslator::new(provider.clone(), &OpenAiConfig::default());

        let out = translator.translate("你好", "en").await.unwrap();
        assert_eq!(out, "hello");

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("'en'"));
        assert_eq!(messages[1].content, "你好");
    }

    #[tokio::test]
    async fn backend_failure_is_lookup_error() {
        let provider = Arc::new(MockProvider::with_outcomes(vec![MockOutcome::Error(
            "down".into(),
        )]));
        let translator = ProviderTranslator::new(provider, &OpenAiConfig::default());
        let err = translator.translate("bonjour", "en").await.unwrap_err();
        assert!(matches!(err, RelayError::Lookup { .. }));
    }
}
