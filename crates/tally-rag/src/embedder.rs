//! Batched chunk embedding.

use crate::TRACING_TARGET;
use crate::document::Chunk;
use crate::provider::EmbeddingProvider;

/// Default number of chunks per embedding request.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// A chunk paired with its embedding vector.
///
/// Consumed exactly once by the store step; the chunk text and metadata
/// travel alongside the vector so the persisted record is self-contained.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    /// The source chunk.
    pub chunk: Chunk,
    /// The embedding vector.
    pub vector: Vec<f32>,
}

/// Embeds chunks in fixed-size sequential batches.
///
/// Batching respects provider rate and request-size limits. A failed batch
/// is logged and its chunks dropped from the output: the embedder returns
/// whatever succeeded and never errors for a single bad batch.
pub struct Embedder {
    provider: EmbeddingProvider,
    batch_size: usize,
}

impl Embedder {
    /// Creates an embedder over the given provider.
    pub fn new(provider: EmbeddingProvider, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Returns the embedding provider.
    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    /// Embeds chunks, preserving chunk order and chunk-vector association.
    pub async fn embed(&self, chunks: Vec<Chunk>) -> Vec<EmbeddedChunk> {
        if chunks.is_empty() {
            tracing::warn!(target: TRACING_TARGET, "No chunks provided for embedding");
            return Vec::new();
        }

        let total = chunks.len();
        let mut embedded = Vec::with_capacity(total);

        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();

            let vectors = match self.provider.embed_texts(texts).await {
                Ok(vectors) => vectors,
                Err(error) => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        batch = %batch_index,
                        error = %error,
                        "Embedding batch failed, dropping its chunks"
                    );
                    continue;
                }
            };

            if vectors.len() != batch.len() {
                tracing::error!(
                    target: TRACING_TARGET,
                    batch = %batch_index,
                    expected = %batch.len(),
                    actual = %vectors.len(),
                    "Embedding count mismatch, dropping batch"
                );
                continue;
            }

            embedded.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(chunk, vector)| EmbeddedChunk { chunk, vector }),
            );
        }

        tracing::info!(
            target: TRACING_TARGET,
            embedded = %embedded.len(),
            total = %total,
            "Generated embeddings"
        );

        embedded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk::new(format!("chunk number {i}"), "report.pdf", i * 100))
            .collect()
    }

    #[tokio::test]
    async fn empty_input_produces_empty_output() {
        let embedder = Embedder::new(EmbeddingProvider::fixed(8), DEFAULT_BATCH_SIZE);
        assert!(embedder.embed(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn every_chunk_keeps_its_vector() {
        let provider = EmbeddingProvider::fixed(8);
        let embedder = Embedder::new(provider.clone(), 4);

        let input = chunks(10);
        let embedded = embedder.embed(input.clone()).await;

        assert_eq!(embedded.len(), 10);
        for (embedded_chunk, original) in embedded.iter().zip(&input) {
            assert_eq!(embedded_chunk.chunk, *original);
            let expected = provider.embed_text(&original.text).await.unwrap();
            assert_eq!(embedded_chunk.vector, expected);
        }
    }

    #[tokio::test]
    async fn batch_size_of_zero_is_clamped() {
        let embedder = Embedder::new(EmbeddingProvider::fixed(4), 0);
        let embedded = embedder.embed(chunks(3)).await;
        assert_eq!(embedded.len(), 3);
    }
}
