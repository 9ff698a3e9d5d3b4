//! Metadata-filtered retrieval over the vector store.
//!
//! Queries are embedded with the same model used at ingestion and resolved
//! through a nearest-neighbor search; pure filter-based access goes through
//! a metadata-only scan. Results are returned in the order the store ranks
//! them; there is no client-side re-ranking.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tally_vector::{Filter, VectorStore};

use crate::TRACING_TARGET;
use crate::provider::EmbeddingProvider;
use crate::{Error, Result};

/// Default number of documents retrieved per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Default limit for metadata-only scans.
pub const DEFAULT_SCAN_LIMIT: usize = 10;

/// Sentinel score for scan results, where no similarity is computed.
const SCAN_SENTINEL_SCORE: f32 = 1.0;

/// Payload field addressing the chunk source filename.
pub(crate) const FIELD_SOURCE: &str = "metadata.source";
/// Payload field addressing the financial-content flag.
pub(crate) const FIELD_FINANCIAL: &str = "metadata.contains_financial_info";
/// Payload field addressing the mentioned-years list.
pub(crate) const FIELD_YEARS: &str = "metadata.years_mentioned";

/// A retrieval result, rebuilt from the persisted payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The text content of the document chunk.
    pub content: String,
    /// Source file of the document.
    pub source: String,
    /// Similarity score (1.0 for metadata-only scans).
    pub score: f32,
    /// Additional metadata persisted with the chunk.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Rebuilds a document from a stored payload.
    pub(crate) fn from_payload(
        score: f32,
        mut payload: std::collections::HashMap<String, serde_json::Value>,
    ) -> Self {
        let content = match payload.remove("text") {
            Some(serde_json::Value::String(text)) => text,
            _ => String::new(),
        };

        let metadata = match payload.remove("metadata") {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };

        let source = metadata
            .get("source")
            .and_then(|value| value.as_str())
            .unwrap_or("Unknown")
            .to_string();

        Self {
            content,
            source,
            score,
            metadata,
        }
    }
}

/// Options for semantic retrieval.
#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    /// Number of documents to retrieve.
    pub k: usize,
    /// Restrict to chunks mentioning this year.
    pub year: Option<i32>,
    /// Restrict to chunks tagged as financial content.
    pub financial_only: bool,
    /// Additional exact-match payload criteria, AND-ed with the rest.
    pub extra: Vec<(String, serde_json::Value)>,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_TOP_K,
            year: None,
            financial_only: false,
            extra: Vec::new(),
        }
    }
}

impl RetrieveOptions {
    /// Creates default retrieval options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of documents to retrieve.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Restricts results to chunks mentioning `year`.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Restricts results to financial content.
    pub fn financial_only(mut self) -> Self {
        self.financial_only = true;
        self
    }

    /// Adds an extra exact-match criterion.
    pub fn with_criterion(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.push((key.into(), value));
        self
    }
}

/// Options for metadata-only scans.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Restrict to chunks tagged as financial content.
    pub financial_only: bool,
    /// Restrict to chunks mentioning this year.
    pub year: Option<i32>,
    /// Restrict to chunks from this source file.
    pub source_file: Option<String>,
    /// Maximum number of results.
    pub limit: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            financial_only: false,
            year: None,
            source_file: None,
            limit: DEFAULT_SCAN_LIMIT,
        }
    }
}

impl ScanOptions {
    /// Creates default scan options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to financial content.
    pub fn financial_only(mut self) -> Self {
        self.financial_only = true;
        self
    }

    /// Restricts results to chunks mentioning `year`.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Restricts results to chunks from `source_file`.
    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// Sets the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Retrieves relevant documents through vector similarity search.
pub struct Retriever {
    provider: EmbeddingProvider,
    store: Arc<VectorStore>,
    collection: String,
}

impl Retriever {
    /// Creates a retriever over an existing store and embedding provider.
    ///
    /// The provider must be the one used at ingestion time: an embedding
    /// model mismatch silently degrades retrieval quality and is not
    /// detectable here.
    pub fn new(
        provider: EmbeddingProvider,
        store: Arc<VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            collection: collection.into(),
        }
    }

    /// Retrieves documents relevant to `query`, ordered by descending
    /// similarity score as returned by the store.
    ///
    /// Failures surface as errors; callers decide how to present them.
    pub async fn retrieve(&self, query: &str, options: RetrieveOptions) -> Result<Vec<Document>> {
        tracing::info!(
            target: TRACING_TARGET,
            query = %query,
            k = %options.k,
            "Retrieving documents"
        );

        let query_vector = self
            .provider
            .embed_text(query)
            .await
            .map_err(|e| Error::embedding(format!("failed to embed query: {e}")))?;

        let filter = build_retrieve_filter(&options);

        let hits = self
            .store
            .search(&self.collection, query_vector, options.k, filter)
            .await
            .map_err(|e| Error::retrieval(format!("vector search failed: {e}")))?;

        let documents: Vec<Document> = hits
            .into_iter()
            .map(|hit| Document::from_payload(hit.score, hit.payload))
            .collect();

        tracing::info!(
            target: TRACING_TARGET,
            count = %documents.len(),
            "Retrieved documents"
        );

        Ok(documents)
    }

    /// Returns documents matching metadata filters alone, without a query
    /// vector. Every result carries the sentinel score 1.0 since no
    /// similarity is computed.
    pub async fn search_by_filters(&self, options: ScanOptions) -> Result<Vec<Document>> {
        let filter = build_scan_filter(&options);

        let records = self
            .store
            .scroll(&self.collection, filter, options.limit)
            .await
            .map_err(|e| Error::retrieval(format!("filter scan failed: {e}")))?;

        let documents: Vec<Document> = records
            .into_iter()
            .map(|record| Document::from_payload(SCAN_SENTINEL_SCORE, record.payload))
            .collect();

        tracing::info!(
            target: TRACING_TARGET,
            count = %documents.len(),
            "Found documents matching filters"
        );

        Ok(documents)
    }
}

/// Builds the conjunctive filter for semantic retrieval.
///
/// Every supplied criterion is AND-ed; omitted criteria are not filtered.
fn build_retrieve_filter(options: &RetrieveOptions) -> Filter {
    let mut filter = Filter::new();

    if let Some(year) = options.year {
        filter = filter.must_match_integer(FIELD_YEARS, i64::from(year));
    }

    if options.financial_only {
        filter = filter.must_match_bool(FIELD_FINANCIAL, true);
    }

    for (key, value) in &options.extra {
        filter = match value {
            serde_json::Value::String(s) => filter.must_match_keyword(key, s.clone()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => filter.must_match_integer(key, i),
                None => filter,
            },
            serde_json::Value::Bool(b) => filter.must_match_bool(key, *b),
            _ => filter,
        };
    }

    filter
}

/// Builds the conjunctive filter for metadata-only scans.
fn build_scan_filter(options: &ScanOptions) -> Filter {
    let mut filter = Filter::new();

    if options.financial_only {
        filter = filter.must_match_bool(FIELD_FINANCIAL, true);
    }

    if let Some(year) = options.year {
        filter = filter.must_match_integer(FIELD_YEARS, i64::from(year));
    }

    if let Some(source_file) = &options.source_file {
        filter = filter.must_match_keyword(FIELD_SOURCE, source_file.clone());
    }

    filter
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tally_vector::{
        CollectionSpec, FieldCondition, ScoredHit, StoredRecord, VectorBackend, VectorRecord,
        VectorResult,
    };

    use super::*;

    /// Backend stub returning canned hits.
    struct StubBackend {
        hits: Vec<ScoredHit>,
        records: Vec<StoredRecord>,
    }

    #[async_trait]
    impl VectorBackend for StubBackend {
        async fn collection_exists(&self, _name: &str) -> VectorResult<bool> {
            Ok(true)
        }

        async fn create_collection(&self, _spec: &CollectionSpec) -> VectorResult<()> {
            Ok(())
        }

        async fn upsert(&self, _collection: &str, _records: Vec<VectorRecord>) -> VectorResult<()> {
            Ok(())
        }

        async fn search(
            &self,
            _collection: &str,
            _query: Vec<f32>,
            limit: usize,
            _filter: Filter,
        ) -> VectorResult<Vec<ScoredHit>> {
            Ok(self.hits.iter().take(limit).cloned().collect())
        }

        async fn scroll(
            &self,
            _collection: &str,
            _filter: Filter,
            limit: usize,
        ) -> VectorResult<Vec<StoredRecord>> {
            Ok(self.records.iter().take(limit).cloned().collect())
        }
    }

    fn payload(text: &str, source: &str) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            ("text".to_string(), serde_json::json!(text)),
            (
                "metadata".to_string(),
                serde_json::json!({ "source": source, "contains_financial_info": true }),
            ),
        ])
    }

    fn retriever(backend: StubBackend) -> Retriever {
        Retriever::new(
            EmbeddingProvider::fixed(8),
            Arc::new(VectorStore::with_backend(Box::new(backend))),
            "reports",
        )
    }

    #[test]
    fn retrieve_filter_is_conjunctive() {
        let options = RetrieveOptions::new()
            .with_year(2022)
            .financial_only()
            .with_criterion("metadata.source", serde_json::json!("report.pdf"));

        let filter = build_retrieve_filter(&options);
        let conditions = filter.conditions();

        assert_eq!(conditions.len(), 3);
        assert!(conditions.contains(&FieldCondition::Integer {
            key: FIELD_YEARS.to_string(),
            value: 2022,
        }));
        assert!(conditions.contains(&FieldCondition::Bool {
            key: FIELD_FINANCIAL.to_string(),
            value: true,
        }));
        assert!(conditions.contains(&FieldCondition::Keyword {
            key: FIELD_SOURCE.to_string(),
            value: "report.pdf".to_string(),
        }));
    }

    #[test]
    fn omitted_criteria_are_not_filtered() {
        let filter = build_retrieve_filter(&RetrieveOptions::new());
        assert!(filter.is_empty());

        let filter = build_scan_filter(&ScanOptions::new());
        assert!(filter.is_empty());
    }

    #[test]
    fn scan_filter_covers_source_file() {
        let options = ScanOptions::new()
            .financial_only()
            .with_year(2022)
            .with_source_file("annual_report_2022.pdf");

        let filter = build_scan_filter(&options);
        assert_eq!(filter.conditions().len(), 3);
    }

    #[test]
    fn document_falls_back_to_unknown_source() {
        let document = Document::from_payload(
            0.5,
            HashMap::from([("text".to_string(), serde_json::json!("body"))]),
        );

        assert_eq!(document.content, "body");
        assert_eq!(document.source, "Unknown");
        assert!(document.metadata.is_empty());
    }

    #[tokio::test]
    async fn retrieve_preserves_store_ranking() {
        let hits = vec![
            ScoredHit {
                id: "a".to_string(),
                score: 0.91,
                payload: payload("first", "a.pdf"),
            },
            ScoredHit {
                id: "b".to_string(),
                score: 0.72,
                payload: payload("second", "b.pdf"),
            },
            ScoredHit {
                id: "c".to_string(),
                score: 0.55,
                payload: payload("third", "c.pdf"),
            },
        ];

        let retriever = retriever(StubBackend {
            hits,
            records: Vec::new(),
        });

        let documents = retriever
            .retrieve("revenue", RetrieveOptions::new())
            .await
            .unwrap();

        assert_eq!(documents.len(), 3);
        for pair in documents.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(documents[0].content, "first");
        assert_eq!(documents[0].source, "a.pdf");
    }

    #[tokio::test]
    async fn scans_carry_the_sentinel_score() {
        let records = vec![StoredRecord {
            id: "a".to_string(),
            payload: payload("financial text", "a.pdf"),
        }];

        let retriever = retriever(StubBackend {
            hits: Vec::new(),
            records,
        });

        let documents = retriever
            .search_by_filters(ScanOptions::new().financial_only())
            .await
            .unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].score, 1.0);
    }
}
