//! Document loading, chunking, and metadata annotation.
//!
//! PDFs are split into overlapping chunks by recursive character-boundary
//! splitting (paragraph, then sentence, then word boundaries before hard
//! cuts), each chunk recording its byte offset in the source text. A second,
//! idempotent pass derives searchable metadata: a financial-content flag and
//! the set of mentioned years.

mod chunk;
mod loader;

use std::path::Path;

use text_splitter::{Characters, ChunkConfig, TextSplitter};

pub use self::chunk::{Chunk, ChunkMetadata};
use crate::TRACING_TARGET;
use crate::{Error, Result};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Keywords that indicate financial sections of a report.
const FINANCIAL_KEYWORDS: &[&str] = &[
    "financial statement",
    "balance sheet",
    "income statement",
    "cash flow",
    "revenue",
    "profit",
    "loss",
    "assets",
    "liabilities",
    "shareholder",
    "dividend",
    "fiscal year",
    "quarterly report",
    "annual report",
    "financial performance",
    "financial results",
];

/// Year range scanned by the annotation pass (inclusive start, exclusive end).
const YEAR_RANGE: std::ops::Range<i32> = 2000..2030;

/// Splits source documents into annotated chunks.
///
/// Chunk size and overlap are fixed per instance, not per call.
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
    splitter: TextSplitter<Characters>,
}

impl DocumentProcessor {
    /// Creates a processor with the given chunk size and overlap.
    ///
    /// Fails when the overlap is not smaller than the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| Error::config(format!("invalid chunking configuration: {e}")))?
            .with_trim(true);

        Ok(Self {
            chunk_size,
            chunk_overlap,
            splitter: TextSplitter::new(config),
        })
    }

    /// Returns the configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the configured chunk overlap.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Loads every PDF in `directory` and splits it into chunks.
    ///
    /// A missing directory, a directory without PDFs, or per-file
    /// extraction failures reduce the output rather than erroring; callers
    /// must treat an empty result as ingestion failure.
    pub fn split(&self, directory: &Path) -> Vec<Chunk> {
        let documents = loader::load_pdf_texts(directory);

        let mut chunks = Vec::new();

        for (source, text) in &documents {
            let document_chunks = self.split_text(source, text);

            tracing::info!(
                target: TRACING_TARGET,
                source = %source,
                chunks = %document_chunks.len(),
                "Processed document"
            );

            chunks.extend(document_chunks);
        }

        tracing::info!(
            target: TRACING_TARGET,
            total = %chunks.len(),
            "Total chunks created"
        );

        chunks
    }

    /// Splits one document's text into chunks with byte offset tracking.
    pub fn split_text(&self, source: &str, text: &str) -> Vec<Chunk> {
        self.splitter
            .chunk_indices(text)
            .map(|(start_index, chunk_text)| Chunk::new(chunk_text, source, start_index))
            .collect()
    }

    /// Tags each chunk with derived metadata.
    ///
    /// Idempotent and side-effect-free: the same chunk set always produces
    /// the same annotations.
    pub fn annotate(&self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        chunks
            .into_iter()
            .map(|mut chunk| {
                chunk.metadata = derive_metadata(&chunk.text);
                chunk
            })
            .collect()
    }
}

/// Derives chunk metadata from its text.
fn derive_metadata(text: &str) -> ChunkMetadata {
    let lowered = text.to_lowercase();

    let contains_financial_info = FINANCIAL_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword));

    // Substring scan, not word-boundary matching: "in 2022," and bare digit
    // runs containing a year both count.
    let years_mentioned = YEAR_RANGE
        .filter(|year| text.contains(&year.to_string()))
        .collect();

    ChunkMetadata {
        contains_financial_info,
        years_mentioned,
    }
}
