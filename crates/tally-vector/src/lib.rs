#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod qdrant;

mod config;
mod error;
mod filter;
mod store;

pub use config::{DistanceMetric, QdrantConfig};
pub use error::{VectorError, VectorResult};
pub use filter::{FieldCondition, Filter};
pub use store::{
    CollectionSpec, PayloadIndex, PayloadIndexKind, ScoredHit, StoredRecord, VectorBackend,
    VectorRecord, VectorStore,
};

/// Tracing target for vector store operations.
pub const TRACING_TARGET: &str = "tally_vector";
