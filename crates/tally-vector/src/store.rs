//! Vector store trait and the Qdrant-backed wrapper.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;
use crate::config::{DistanceMetric, QdrantConfig};
use crate::error::VectorResult;
use crate::filter::Filter;
use crate::qdrant::QdrantBackend;

/// A vector record to be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique identifier for the record.
    pub id: String,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Payload stored alongside the vector.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub payload: HashMap<String, serde_json::Value>,
}

impl VectorRecord {
    /// Creates a new record with an ID and embedding.
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            payload: HashMap::new(),
        }
    }

    /// Replaces the payload.
    pub fn with_payload(
        mut self,
        payload: impl IntoIterator<Item = (impl Into<String>, serde_json::Value)>,
    ) -> Self {
        self.payload = payload.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    /// Adds a single payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

/// A scored hit from a nearest-neighbor search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    /// Record ID.
    pub id: String,
    /// Similarity score as reported by the backend.
    pub score: f32,
    /// Associated payload.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub payload: HashMap<String, serde_json::Value>,
}

/// A record returned by a metadata-only scan (no similarity computed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Record ID.
    pub id: String,
    /// Associated payload.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub payload: HashMap<String, serde_json::Value>,
}

/// Kind of payload index to create on a collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadIndexKind {
    /// Keyword (exact string) index.
    Keyword,
    /// Integer index.
    Integer,
    /// Boolean index.
    Bool,
}

/// A payload index definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadIndex {
    /// Payload field to index.
    pub field: String,
    /// Index kind.
    pub kind: PayloadIndexKind,
}

impl PayloadIndex {
    /// Creates a payload index definition.
    pub fn new(field: impl Into<String>, kind: PayloadIndexKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// Collection schema: dimensionality, distance metric, and payload indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: String,
    /// Vector dimensionality.
    pub dimensions: usize,
    /// Distance metric.
    pub distance: DistanceMetric,
    /// Payload indexes created with the collection.
    pub payload_indexes: Vec<PayloadIndex>,
}

impl CollectionSpec {
    /// Creates a collection spec with cosine distance and no payload indexes.
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            distance: DistanceMetric::Cosine,
            payload_indexes: Vec::new(),
        }
    }

    /// Sets the distance metric.
    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    /// Adds a payload index.
    pub fn with_payload_index(mut self, field: impl Into<String>, kind: PayloadIndexKind) -> Self {
        self.payload_indexes.push(PayloadIndex::new(field, kind));
        self
    }
}

/// Trait for vector store backends.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Checks if a collection exists.
    async fn collection_exists(&self, name: &str) -> VectorResult<bool>;

    /// Creates a collection with its payload indexes.
    async fn create_collection(&self, spec: &CollectionSpec) -> VectorResult<()>;

    /// Upserts records into a collection as one bulk write.
    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> VectorResult<()>;

    /// Searches for nearest neighbors, optionally constrained by a filter.
    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: usize,
        filter: Filter,
    ) -> VectorResult<Vec<ScoredHit>>;

    /// Scans records matching a filter without a query vector.
    async fn scroll(
        &self,
        collection: &str,
        filter: Filter,
        limit: usize,
    ) -> VectorResult<Vec<StoredRecord>>;
}

/// Vector store wrapping a backend implementation.
pub struct VectorStore {
    backend: Box<dyn VectorBackend>,
}

impl VectorStore {
    /// Connects to a Qdrant-backed store.
    ///
    /// Connection and configuration errors surface here, before any
    /// request-path operation runs.
    pub async fn qdrant(config: QdrantConfig) -> VectorResult<Self> {
        let backend = QdrantBackend::connect(&config).await?;

        tracing::info!(
            target: TRACING_TARGET,
            url = %config.url,
            "Vector store initialized"
        );

        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Creates a store over an arbitrary backend.
    pub fn with_backend(backend: Box<dyn VectorBackend>) -> Self {
        Self { backend }
    }

    /// Ensures a collection exists, creating it (with payload indexes) only
    /// when missing. A pre-existing collection is left untouched.
    pub async fn ensure_collection(&self, spec: &CollectionSpec) -> VectorResult<()> {
        if self.backend.collection_exists(&spec.name).await? {
            tracing::debug!(
                target: TRACING_TARGET,
                collection = %spec.name,
                "Collection already exists"
            );
            return Ok(());
        }

        tracing::info!(
            target: TRACING_TARGET,
            collection = %spec.name,
            dimensions = %spec.dimensions,
            "Creating collection"
        );
        self.backend.create_collection(spec).await
    }

    /// Checks if a collection exists.
    pub async fn collection_exists(&self, name: &str) -> VectorResult<bool> {
        self.backend.collection_exists(name).await
    }

    /// Upserts records into a collection as one bulk write.
    pub async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> VectorResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %collection,
            count = %records.len(),
            "Upserting records"
        );
        self.backend.upsert(collection, records).await
    }

    /// Searches for nearest neighbors, optionally constrained by a filter.
    pub async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: usize,
        filter: Filter,
    ) -> VectorResult<Vec<ScoredHit>> {
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %collection,
            limit = %limit,
            filtered = !filter.is_empty(),
            "Searching vectors"
        );
        self.backend.search(collection, query, limit, filter).await
    }

    /// Scans records matching a filter without a query vector.
    pub async fn scroll(
        &self,
        collection: &str,
        filter: Filter,
        limit: usize,
    ) -> VectorResult<Vec<StoredRecord>> {
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %collection,
            limit = %limit,
            "Scrolling records"
        );
        self.backend.scroll(collection, filter, limit).await
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore").finish_non_exhaustive()
    }
}
