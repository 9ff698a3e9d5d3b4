//! CLI argument and configuration types.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tally_rag::provider::OpenAiEmbeddingModel;
use tally_rag::{QdrantConfig, RagConfig};

/// Retrieval-augmented question answering over PDF reports.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Provider and store configuration shared by every command.
#[derive(Debug, Args)]
pub struct ServiceArgs {
    /// OpenAI API key used for embeddings and completions
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Qdrant server URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6334")]
    pub qdrant_url: String,

    /// Qdrant API key (for secured deployments)
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    /// Vector collection name
    #[arg(long, env = "TALLY_COLLECTION", default_value = "company_reports")]
    pub collection: String,

    /// Chunk size in characters
    #[arg(long, env = "TALLY_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks, in characters
    #[arg(long, env = "TALLY_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Embedding model name
    #[arg(long, env = "TALLY_EMBEDDING_MODEL", default_value = "text-embedding-ada-002")]
    pub embedding_model: String,

    /// Completion model name
    #[arg(long, env = "TALLY_COMPLETION_MODEL", default_value = "gpt-3.5-turbo")]
    pub completion_model: String,
}

impl ServiceArgs {
    /// Builds the service configuration from the parsed arguments.
    pub fn to_rag_config(&self) -> anyhow::Result<RagConfig> {
        let embedding_model: OpenAiEmbeddingModel = self
            .embedding_model
            .parse()
            .context("invalid embedding model")?;

        let mut qdrant = QdrantConfig::new(&self.qdrant_url);
        if let Some(api_key) = &self.qdrant_api_key {
            qdrant = qdrant.with_api_key(api_key);
        }

        Ok(RagConfig::new(&self.openai_api_key)
            .with_qdrant(qdrant)
            .with_collection(&self.collection)
            .with_chunking(self.chunk_size, self.chunk_overlap)
            .with_embedding_model(embedding_model)
            .with_completion_model(&self.completion_model))
    }
}

/// Commands, each mapped 1:1 onto a service operation.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest PDF documents from a directory
    Ingest {
        /// Directory containing PDF files
        #[arg(long)]
        dir: PathBuf,

        /// Skip metadata extraction
        #[arg(long)]
        no_metadata: bool,
    },

    /// Query the document collection
    Query {
        /// Query text
        #[arg(long)]
        text: String,

        /// Number of documents to retrieve
        #[arg(long, default_value_t = 5)]
        k: usize,

        /// Filter by year
        #[arg(long)]
        year: Option<i32>,

        /// Filter for financial information only
        #[arg(long)]
        financial: bool,
    },

    /// Generate a financial summary
    Summary {
        /// Year to summarize
        #[arg(long)]
        year: Option<i32>,

        /// Number of documents to retrieve
        #[arg(long, default_value_t = 10)]
        k: usize,
    },

    /// Run the interactive demo loop
    Repl {
        /// Directory containing PDF files to ingest first
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Skip document ingestion
        #[arg(long)]
        skip_ingestion: bool,
    },
}
