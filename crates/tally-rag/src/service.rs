//! The orchestrating RAG service.
//!
//! Wires the document processor, embedder, vector store, retriever,
//! generator, and conversation memory together behind four operations:
//! `ingest`, `query`, `chat`, and `financial_summary`. Component failures
//! are converted into user-readable answers here; nothing bubbles past the
//! service on the request path.

use std::path::Path;
use std::sync::Arc;

use tally_vector::{CollectionSpec, PayloadIndexKind, QdrantConfig, VectorRecord, VectorStore};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::document::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DocumentProcessor};
use crate::embedder::{DEFAULT_BATCH_SIZE, Embedder};
use crate::generator::Generator;
use crate::memory::{ConversationMemory, Message};
use crate::provider::{CompletionProvider, EmbeddingProvider, OpenAiEmbeddingModel};
use crate::retriever::{
    DEFAULT_TOP_K, FIELD_FINANCIAL, FIELD_SOURCE, FIELD_YEARS, RetrieveOptions, Retriever,
    ScanOptions,
};
use crate::{Error, Result, TRACING_TARGET};

/// Default vector collection name.
pub(crate) const DEFAULT_COLLECTION: &str = "company_reports";

/// Default cap on stored conversation messages.
const DEFAULT_MAX_HISTORY: usize = 20;

/// Default number of prior messages fed to conversational generation.
const DEFAULT_CONVERSATION_CONTEXT: usize = 5;

/// Answer returned when retrieval succeeds but matches nothing.
pub const NO_RELEVANT_DOCUMENTS: &str = "No relevant documents found to answer your query.";

/// Configuration for the RAG service.
///
/// Explicit and constructor-passed: components never read process-wide
/// state. Environment variables are resolved by the caller (the CLI layer).
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// OpenAI API key, used by both embedding and completion providers.
    pub openai_api_key: String,
    /// Qdrant connection settings.
    pub qdrant: QdrantConfig,
    /// Vector collection name.
    pub collection: String,
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap: usize,
    /// Embedding model (fixes vector dimensionality).
    pub embedding_model: OpenAiEmbeddingModel,
    /// Completion model name.
    pub completion_model: String,
    /// Completion sampling temperature.
    pub temperature: f64,
    /// Chunks per embedding request.
    pub embed_batch_size: usize,
    /// Cap on stored conversation messages.
    pub max_history: usize,
    /// Prior messages included in conversational prompts.
    pub conversation_context_size: usize,
}

impl RagConfig {
    /// Creates a configuration with defaults for everything but the API key.
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
            qdrant: QdrantConfig::default(),
            collection: DEFAULT_COLLECTION.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embedding_model: OpenAiEmbeddingModel::default(),
            completion_model: crate::provider::DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: crate::provider::DEFAULT_TEMPERATURE,
            embed_batch_size: DEFAULT_BATCH_SIZE,
            max_history: DEFAULT_MAX_HISTORY,
            conversation_context_size: DEFAULT_CONVERSATION_CONTEXT,
        }
    }

    /// Sets the Qdrant connection settings.
    pub fn with_qdrant(mut self, qdrant: QdrantConfig) -> Self {
        self.qdrant = qdrant;
        self
    }

    /// Sets the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Sets chunk size and overlap.
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Sets the embedding model.
    pub fn with_embedding_model(mut self, model: OpenAiEmbeddingModel) -> Self {
        self.embedding_model = model;
        self
    }

    /// Sets the completion model.
    pub fn with_completion_model(mut self, model: impl Into<String>) -> Self {
        self.completion_model = model.into();
        self
    }
}

/// Options shared by `query` and `chat`.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Number of documents to retrieve.
    pub k: usize,
    /// Restrict to chunks mentioning this year.
    pub year: Option<i32>,
    /// Restrict to chunks tagged as financial content.
    pub financial_only: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_TOP_K,
            year: None,
            financial_only: false,
        }
    }
}

impl QueryOptions {
    /// Creates default query options.
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

    fn retrieve_options(&self) -> RetrieveOptions {
        let mut options = RetrieveOptions::new().with_k(self.k);
        if let Some(year) = self.year {
            options = options.with_year(year);
        }
        if self.financial_only {
            options = options.financial_only();
        }
        options
    }
}

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Chunks produced by splitting.
    pub chunks: usize,
    /// Chunks embedded and stored.
    pub stored: usize,
}

/// High-level RAG service.
///
/// Cheap to clone and shareable across tasks; conversation memory mutation
/// is serialized through a mutex.
#[derive(Clone)]
pub struct RagService {
    inner: Arc<RagServiceInner>,
}

struct RagServiceInner {
    config: RagConfig,
    processor: DocumentProcessor,
    embedder: Embedder,
    store: Arc<VectorStore>,
    retriever: Retriever,
    generator: Generator,
    memory: Mutex<ConversationMemory>,
}

impl RagService {
    /// Connects providers and the vector store, and ensures the collection
    /// exists with its payload indexes.
    ///
    /// Configuration problems (bad URL, rejected credentials, invalid
    /// chunking parameters) fail here, before any request runs.
    pub async fn connect(config: RagConfig) -> Result<Self> {
        let embedding =
            EmbeddingProvider::openai(&config.openai_api_key, config.embedding_model)?;
        let completion = CompletionProvider::openai(
            &config.openai_api_key,
            &config.completion_model,
            config.temperature,
        )?;

        let store = Arc::new(VectorStore::qdrant(config.qdrant.clone()).await?);
        store
            .ensure_collection(&collection_spec(&config.collection, embedding.dimensions()))
            .await?;

        let service = Self::assemble(config, embedding, completion, store)?;

        tracing::info!(
            target: TRACING_TARGET,
            collection = %service.inner.config.collection,
            "RAG service initialized"
        );

        Ok(service)
    }

    /// Assembles a service over pre-built providers and store.
    ///
    /// Used by tests to run the full request path offline.
    #[cfg(any(test, feature = "mock"))]
    pub fn with_providers(
        config: RagConfig,
        embedding: EmbeddingProvider,
        completion: CompletionProvider,
        store: Arc<VectorStore>,
    ) -> Result<Self> {
        Self::assemble(config, embedding, completion, store)
    }

    fn assemble(
        config: RagConfig,
        embedding: EmbeddingProvider,
        completion: CompletionProvider,
        store: Arc<VectorStore>,
    ) -> Result<Self> {
        let processor = DocumentProcessor::new(config.chunk_size, config.chunk_overlap)?;
        let embedder = Embedder::new(embedding.clone(), config.embed_batch_size);
        let retriever = Retriever::new(embedding, Arc::clone(&store), config.collection.clone());
        let generator = Generator::new(completion);
        let memory = Mutex::new(ConversationMemory::new(config.max_history));

        Ok(Self {
            inner: Arc::new(RagServiceInner {
                config,
                processor,
                embedder,
                store,
                retriever,
                generator,
                memory,
            }),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Ingests every PDF under `directory` into the vector collection.
    ///
    /// Splits, annotates, embeds, then upserts, short-circuiting at the
    /// first stage that produces nothing. Re-ingesting a document stores duplicate
    /// records: point IDs are freshly random and nothing is
    /// content-addressed.
    pub async fn ingest(&self, directory: &Path, process_metadata: bool) -> Result<IngestReport> {
        tracing::info!(
            target: TRACING_TARGET,
            directory = %directory.display(),
            "Starting document ingestion"
        );

        let chunks = self.inner.processor.split(directory);
        if chunks.is_empty() {
            return Err(Error::ingest("no chunks created from documents"));
        }

        let chunks = if process_metadata {
            self.inner.processor.annotate(chunks)
        } else {
            chunks
        };
        let chunk_count = chunks.len();

        let embedded = self.inner.embedder.embed(chunks).await;
        if embedded.is_empty() {
            return Err(Error::ingest("no embeddings generated"));
        }

        let records: Vec<VectorRecord> = embedded
            .into_iter()
            .map(|embedded_chunk| {
                VectorRecord::new(Uuid::new_v4().to_string(), embedded_chunk.vector)
                    .with_payload(embedded_chunk.chunk.into_payload())
            })
            .collect();
        let stored = records.len();

        self.inner
            .store
            .upsert(&self.inner.config.collection, records)
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            chunks = %chunk_count,
            stored = %stored,
            "Ingestion complete"
        );

        Ok(IngestReport {
            chunks: chunk_count,
            stored,
        })
    }

    /// Answers a one-off question. Stateless: conversation memory is
    /// neither consulted nor updated.
    pub async fn query(&self, text: &str, options: QueryOptions) -> String {
        tracing::info!(target: TRACING_TARGET, query = %text, "Processing query");

        match self
            .inner
            .retriever
            .retrieve(text, options.retrieve_options())
            .await
        {
            Ok(documents) if documents.is_empty() => NO_RELEVANT_DOCUMENTS.to_string(),
            Ok(documents) => {
                self.inner
                    .generator
                    .generate_response(text, &documents)
                    .await
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Error processing query"
                );
                format!("An error occurred while processing your query: {error}")
            }
        }
    }

    /// Answers a question within the running conversation.
    ///
    /// The user turn is recorded before retrieval, so a failed retrieval
    /// still leaves it in the transcript. Whatever string comes back
    /// (answer, sentinel, or error wording) is recorded as the assistant
    /// turn.
    pub async fn chat(&self, text: &str, options: QueryOptions) -> String {
        tracing::info!(target: TRACING_TARGET, query = %text, "Processing conversational query");

        self.inner.memory.lock().await.add_user_message(text);

        let documents = match self
            .inner
            .retriever
            .retrieve(text, options.retrieve_options())
            .await
        {
            Ok(documents) => documents,
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Error processing conversational query"
                );
                let response = format!("An error occurred while processing your query: {error}");
                self.inner
                    .memory
                    .lock()
                    .await
                    .add_assistant_message(response.clone());
                return response;
            }
        };

        if documents.is_empty() {
            self.inner
                .memory
                .lock()
                .await
                .add_assistant_message(NO_RELEVANT_DOCUMENTS);
            return NO_RELEVANT_DOCUMENTS.to_string();
        }

        let history = self
            .inner
            .memory
            .lock()
            .await
            .context_string(Some(self.inner.config.conversation_context_size));

        let response = self
            .inner
            .generator
            .generate_conversational_response(text, &documents, &history)
            .await;

        self.inner
            .memory
            .lock()
            .await
            .add_assistant_message(response.clone());

        response
    }

    /// Summarizes stored financial content, optionally for one year.
    ///
    /// Bypasses semantic retrieval entirely: documents come from the
    /// metadata-only filter scan with the financial flag forced on.
    pub async fn financial_summary(&self, year: Option<i32>, k: usize) -> String {
        let mut options = ScanOptions::new().financial_only().with_limit(k);
        if let Some(year) = year {
            options = options.with_year(year);
        }

        match self.inner.retriever.search_by_filters(options).await {
            Ok(documents) if documents.is_empty() => {
                let scope = year.map(|y| format!(" for {y}")).unwrap_or_default();
                format!("No financial information found{scope}.")
            }
            Ok(documents) => {
                self.inner
                    .generator
                    .generate_financial_summary(&documents)
                    .await
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Error generating financial summary"
                );
                format!("An error occurred while generating the financial summary: {error}")
            }
        }
    }

    /// Returns the conversation history.
    pub async fn conversation_history(&self) -> Vec<Message> {
        self.inner.memory.lock().await.history().to_vec()
    }

    /// Clears the conversation history.
    pub async fn clear_conversation(&self) {
        self.inner.memory.lock().await.clear();
        tracing::info!(target: TRACING_TARGET, "Conversation history cleared");
    }
}

/// The collection schema: configured dimensionality, cosine distance, and
/// the three filterable payload fields.
fn collection_spec(name: &str, dimensions: usize) -> CollectionSpec {
    CollectionSpec::new(name, dimensions)
        .with_payload_index(FIELD_SOURCE, PayloadIndexKind::Keyword)
        .with_payload_index(FIELD_FINANCIAL, PayloadIndexKind::Bool)
        .with_payload_index(FIELD_YEARS, PayloadIndexKind::Integer)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tally_vector::{Filter, ScoredHit, StoredRecord, VectorBackend, VectorResult};

    use super::*;
    use crate::memory::MessageRole;

    /// Backend stub with canned results and an upsert counter.
    #[derive(Default)]
    struct StubBackend {
        hits: Vec<ScoredHit>,
        records: Vec<StoredRecord>,
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl VectorBackend for StubBackend {
        async fn collection_exists(&self, _name: &str) -> VectorResult<bool> {
            Ok(true)
        }

        async fn create_collection(&self, _spec: &CollectionSpec) -> VectorResult<()> {
            Ok(())
        }

        async fn upsert(
            &self,
            _collection: &str,
            _records: Vec<VectorRecord>,
        ) -> VectorResult<()> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
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

    fn hit(text: &str, score: f32) -> ScoredHit {
        ScoredHit {
            id: Uuid::new_v4().to_string(),
            score,
            payload: HashMap::from([
                ("text".to_string(), serde_json::json!(text)),
                (
                    "metadata".to_string(),
                    serde_json::json!({ "source": "report.pdf" }),
                ),
            ]),
        }
    }

    fn service(backend: StubBackend, completion: CompletionProvider) -> RagService {
        RagService::with_providers(
            RagConfig::new("test-key"),
            EmbeddingProvider::fixed(8),
            completion,
            Arc::new(VectorStore::with_backend(Box::new(backend))),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn ingest_of_empty_directory_fails_and_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(StubBackend::default(), CompletionProvider::fixed("unused"));

        let result = service.ingest(dir.path(), true).await;

        assert!(matches!(result, Err(Error::Ingest(_))));
    }

    #[tokio::test]
    async fn query_is_stateless() {
        let backend = StubBackend {
            hits: vec![hit("Revenue was $10 million.", 0.9)],
            ..Default::default()
        };
        let service = service(backend, CompletionProvider::fixed("an answer"));

        let answer = service.query("What was revenue?", QueryOptions::new()).await;

        assert_eq!(answer, "an answer");
        assert!(service.conversation_history().await.is_empty());
    }

    #[tokio::test]
    async fn query_with_no_matches_reports_no_documents() {
        let service = service(StubBackend::default(), CompletionProvider::fixed("unused"));

        let answer = service.query("anything", QueryOptions::new()).await;
        assert_eq!(answer, NO_RELEVANT_DOCUMENTS);
    }

    #[tokio::test]
    async fn chat_with_zero_documents_records_two_messages_and_skips_generation() {
        let completion = CompletionProvider::fixed("unused");
        let service = service(StubBackend::default(), completion.clone());

        let answer = service.chat("What was revenue?", QueryOptions::new()).await;

        assert_eq!(answer, NO_RELEVANT_DOCUMENTS);
        assert_eq!(completion.calls(), 0);

        let history = service.conversation_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), MessageRole::User);
        assert_eq!(history[0].content(), "What was revenue?");
        assert_eq!(history[1].role(), MessageRole::Assistant);
        assert_eq!(history[1].content(), NO_RELEVANT_DOCUMENTS);
    }

    #[tokio::test]
    async fn chat_records_generated_answers() {
        let backend = StubBackend {
            hits: vec![hit("Revenue was $10 million.", 0.9)],
            ..Default::default()
        };
        let completion = CompletionProvider::fixed("Revenue was $10 million in 2022.");
        let service = service(backend, completion.clone());

        let answer = service
            .chat("What was the 2022 revenue?", QueryOptions::new().with_year(2022))
            .await;

        assert_eq!(answer, "Revenue was $10 million in 2022.");
        assert_eq!(completion.calls(), 1);

        let history = service.conversation_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content(), "Revenue was $10 million in 2022.");
    }

    #[tokio::test]
    async fn financial_summary_reports_missing_data_with_year_scope() {
        let service = service(StubBackend::default(), CompletionProvider::fixed("unused"));

        let summary = service.financial_summary(Some(2022), 10).await;
        assert_eq!(summary, "No financial information found for 2022.");

        let summary = service.financial_summary(None, 10).await;
        assert_eq!(summary, "No financial information found.");
    }

    #[tokio::test]
    async fn financial_summary_uses_the_scan_path() {
        let backend = StubBackend {
            records: vec![StoredRecord {
                id: "a".to_string(),
                payload: HashMap::from([
                    ("text".to_string(), serde_json::json!("Revenue grew 15%.")),
                    (
                        "metadata".to_string(),
                        serde_json::json!({ "source": "report.pdf" }),
                    ),
                ]),
            }],
            ..Default::default()
        };
        let completion = CompletionProvider::fixed("Summary: revenue grew 15%.");
        let service = service(backend, completion.clone());

        let summary = service.financial_summary(Some(2022), 10).await;

        assert_eq!(summary, "Summary: revenue grew 15%.");
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn clear_conversation_empties_history() {
        let backend = StubBackend {
            hits: vec![hit("text", 0.9)],
            ..Default::default()
        };
        let service = service(backend, CompletionProvider::fixed("answer"));

        service.chat("question", QueryOptions::new()).await;
        assert!(!service.conversation_history().await.is_empty());

        service.clear_conversation().await;
        assert!(service.conversation_history().await.is_empty());
    }

    #[test]
    fn collection_spec_declares_the_three_payload_indexes() {
        let spec = collection_spec("company_reports", 1536);

        assert_eq!(spec.dimensions, 1536);
        assert_eq!(spec.payload_indexes.len(), 3);
        assert!(
            spec.payload_indexes
                .iter()
                .any(|index| index.field == FIELD_YEARS
                    && index.kind == PayloadIndexKind::Integer)
        );
    }
}
