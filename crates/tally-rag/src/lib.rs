#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod document;
pub mod generator;
pub mod memory;
pub mod provider;
pub mod retriever;

mod embedder;
mod error;
mod service;

pub use embedder::{DEFAULT_BATCH_SIZE, EmbeddedChunk, Embedder};
pub use error::{Error, Result};
pub use service::{IngestReport, NO_RELEVANT_DOCUMENTS, QueryOptions, RagConfig, RagService};
pub use tally_vector::QdrantConfig;

/// Tracing target for the main library.
pub const TRACING_TARGET: &str = "tally_rag";
