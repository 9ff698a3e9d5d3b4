//! Embedding and completion providers.
//!
//! Thin, cheaply cloneable wrappers over the rig-core OpenAI clients. Model
//! names and dimensionality are configuration, fixed at construction time;
//! nothing is negotiated per call.

mod completion;
mod embedding;

pub use completion::CompletionProvider;
pub(crate) use completion::{DEFAULT_COMPLETION_MODEL, DEFAULT_TEMPERATURE};
pub use embedding::{EmbeddingProvider, OpenAiEmbeddingModel};
