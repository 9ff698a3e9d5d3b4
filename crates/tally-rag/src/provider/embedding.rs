//! Embedding provider abstraction.

use std::str::FromStr;
use std::sync::Arc;

use rig::embeddings::EmbeddingModel as RigEmbeddingModel;
use rig::prelude::EmbeddingsClient;
use rig::providers::openai;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// OpenAI embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenAiEmbeddingModel {
    /// text-embedding-ada-002 (legacy, 1536 dimensions)
    #[default]
    TextEmbeddingAda002,
    /// text-embedding-3-small (1536 dimensions)
    TextEmbedding3Small,
    /// text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
}

impl OpenAiEmbeddingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextEmbeddingAda002 => "text-embedding-ada-002",
            Self::TextEmbedding3Small => "text-embedding-3-small",
            Self::TextEmbedding3Large => "text-embedding-3-large",
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Self::TextEmbeddingAda002 | Self::TextEmbedding3Small => 1536,
            Self::TextEmbedding3Large => 3072,
        }
    }
}

impl FromStr for OpenAiEmbeddingModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text-embedding-ada-002" => Ok(Self::TextEmbeddingAda002),
            "text-embedding-3-small" => Ok(Self::TextEmbedding3Small),
            "text-embedding-3-large" => Ok(Self::TextEmbedding3Large),
            other => Err(Error::config(format!("unknown embedding model: {other}"))),
        }
    }
}

impl std::fmt::Display for OpenAiEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embedding provider that wraps a rig embedding model implementation.
///
/// This is a cheaply cloneable wrapper around an `Arc<EmbeddingService>`.
#[derive(Clone)]
pub struct EmbeddingProvider(Arc<EmbeddingService>);

enum EmbeddingService {
    OpenAi {
        model: openai::EmbeddingModel,
        model_name: String,
        dimensions: usize,
    },
    #[cfg(any(test, feature = "mock"))]
    Fixed { dimensions: usize },
}

impl EmbeddingProvider {
    /// Creates an OpenAI embedding provider.
    pub fn openai(api_key: &str, model: OpenAiEmbeddingModel) -> Result<Self> {
        let client = openai::Client::new(api_key)
            .map_err(|e| Error::provider("openai", e.to_string()))?;

        Ok(Self(Arc::new(EmbeddingService::OpenAi {
            model: client.embedding_model_with_ndims(model.as_str(), model.dimensions()),
            model_name: model.as_str().to_string(),
            dimensions: model.dimensions(),
        })))
    }

    /// Creates a deterministic offline provider for tests.
    ///
    /// Vectors are derived from the input text alone; no network calls.
    #[cfg(any(test, feature = "mock"))]
    pub fn fixed(dimensions: usize) -> Self {
        Self(Arc::new(EmbeddingService::Fixed { dimensions }))
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        match self.0.as_ref() {
            EmbeddingService::OpenAi { model_name, .. } => model_name,
            #[cfg(any(test, feature = "mock"))]
            EmbeddingService::Fixed { .. } => "fixed",
        }
    }

    /// Returns the embedding dimensionality.
    pub fn dimensions(&self) -> usize {
        match self.0.as_ref() {
            EmbeddingService::OpenAi { dimensions, .. } => *dimensions,
            #[cfg(any(test, feature = "mock"))]
            EmbeddingService::Fixed { dimensions } => *dimensions,
        }
    }

    /// Embeds a single text (used for queries).
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding("provider returned no embedding"))
    }

    /// Embeds multiple texts in one provider request, preserving input order.
    pub async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        match self.0.as_ref() {
            EmbeddingService::OpenAi { model, .. } => {
                let embeddings = model
                    .embed_texts(texts)
                    .await
                    .map_err(|e| Error::provider("openai", e.to_string()))?;

                Ok(embeddings
                    .into_iter()
                    .map(|e| e.vec.iter().map(|&x| x as f32).collect())
                    .collect())
            }
            #[cfg(any(test, feature = "mock"))]
            EmbeddingService::Fixed { dimensions } => Ok(texts
                .iter()
                .map(|text| pseudo_embedding(text, *dimensions))
                .collect()),
        }
    }
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("model", &self.model_name())
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Derives a deterministic vector from text for offline tests.
#[cfg(any(test, feature = "mock"))]
fn pseudo_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let seed = text
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

    (0..dimensions)
        .map(|i| (seed.wrapping_add(i as u32) % 1000) as f32 / 1000.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_round_trip() {
        for model in [
            OpenAiEmbeddingModel::TextEmbeddingAda002,
            OpenAiEmbeddingModel::TextEmbedding3Small,
            OpenAiEmbeddingModel::TextEmbedding3Large,
        ] {
            assert_eq!(model.as_str().parse::<OpenAiEmbeddingModel>().unwrap(), model);
        }
    }

    #[test]
    fn unknown_model_name_is_a_config_error() {
        let err = "text-embedding-4".parse::<OpenAiEmbeddingModel>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn fixed_provider_is_deterministic() {
        let provider = EmbeddingProvider::fixed(8);

        let a = provider.embed_text("revenue in 2022").await.unwrap();
        let b = provider.embed_text("revenue in 2022").await.unwrap();

        assert_eq!(a.len(), 8);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fixed_provider_preserves_input_order() {
        let provider = EmbeddingProvider::fixed(4);
        let texts = vec!["alpha".to_string(), "beta".to_string()];

        let vectors = provider.embed_texts(texts.clone()).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], pseudo_embedding(&texts[0], 4));
        assert_eq!(vectors[1], pseudo_embedding(&texts[1], 4));
    }
}
