//! Qdrant vector store backend.

mod backend;

pub use backend::QdrantBackend;
