//! Completion provider abstraction.

use std::sync::Arc;
#[cfg(any(test, feature = "mock"))]
use std::sync::atomic::{AtomicUsize, Ordering};

use rig::completion::{AssistantContent, CompletionModel as RigCompletionModel};
use rig::one_or_many::OneOrMany;
use rig::prelude::CompletionClient;
use rig::providers::openai;

use crate::{Error, Result};

/// Default completion model.
pub(crate) const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";

/// Default sampling temperature for grounded answers.
pub(crate) const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Completion provider that wraps a rig completion model implementation.
///
/// This is a cheaply cloneable wrapper around an `Arc<CompletionService>`.
#[derive(Clone)]
pub struct CompletionProvider(Arc<CompletionService>);

enum CompletionService {
    OpenAi {
        model: openai::CompletionModel,
        model_name: String,
        temperature: f64,
    },
    #[cfg(any(test, feature = "mock"))]
    Fixed {
        reply: String,
        calls: AtomicUsize,
    },
}

impl CompletionProvider {
    /// Creates an OpenAI completion provider.
    pub fn openai(api_key: &str, model_name: &str, temperature: f64) -> Result<Self> {
        let client = openai::Client::new(api_key)
            .map_err(|e| Error::provider("openai", e.to_string()))?
            .completions_api();

        Ok(Self(Arc::new(CompletionService::OpenAi {
            model: client.completion_model(model_name),
            model_name: model_name.to_string(),
            temperature,
        })))
    }

    /// Creates an offline provider that always returns `reply`.
    #[cfg(any(test, feature = "mock"))]
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self(Arc::new(CompletionService::Fixed {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }))
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        match self.0.as_ref() {
            CompletionService::OpenAi { model_name, .. } => model_name,
            #[cfg(any(test, feature = "mock"))]
            CompletionService::Fixed { .. } => "fixed",
        }
    }

    /// Number of completion calls issued so far (offline provider only).
    #[cfg(any(test, feature = "mock"))]
    pub fn calls(&self) -> usize {
        match self.0.as_ref() {
            CompletionService::Fixed { calls, .. } => calls.load(Ordering::SeqCst),
            _ => 0,
        }
    }

    /// Sends a single-turn completion request for a filled prompt.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        match self.0.as_ref() {
            CompletionService::OpenAi {
                model,
                model_name,
                temperature,
            } => model
                .completion_request(prompt)
                .temperature(*temperature)
                .send()
                .await
                .map(|r| extract_text_content(&r.choice))
                .map_err(|e| Error::provider(model_name, e.to_string())),
            #[cfg(any(test, feature = "mock"))]
            CompletionService::Fixed { reply, calls } => {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(reply.clone())
            }
        }
    }
}

/// Extracts text content from assistant content choices.
fn extract_text_content(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

impl std::fmt::Debug for CompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionProvider")
            .field("model", &self.model_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_provider_counts_calls() {
        let provider = CompletionProvider::fixed("the answer");

        assert_eq!(provider.calls(), 0);
        assert_eq!(provider.complete("prompt").await.unwrap(), "the answer");
        assert_eq!(provider.calls(), 1);
    }
}
