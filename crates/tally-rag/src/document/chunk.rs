//! Document chunk types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Derived metadata attached to a chunk by the annotation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// True when the chunk text matches any financial keyword.
    pub contains_financial_info: bool,
    /// Years in `[2000, 2030)` appearing as literal substrings, sorted.
    pub years_mentioned: Vec<i32>,
}

/// A contiguous span of text extracted from one source document.
///
/// Created once during ingestion and immutable after annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text content.
    pub text: String,
    /// Originating filename.
    pub source: String,
    /// Byte offset of the chunk in the extracted document text.
    pub start_index: usize,
    /// Derived metadata.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Creates a chunk with empty metadata.
    pub fn new(text: impl Into<String>, source: impl Into<String>, start_index: usize) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            start_index,
            metadata: ChunkMetadata::default(),
        }
    }

    /// Builds the payload persisted alongside the chunk's vector.
    ///
    /// Layout: `{ text, metadata: { source, contains_financial_info,
    /// years_mentioned, start_index } }`. Filterable fields live under
    /// `metadata.*` so payload indexes and search filters share one
    /// addressing scheme.
    pub fn into_payload(self) -> HashMap<String, serde_json::Value> {
        let metadata = serde_json::json!({
            "source": self.source,
            "contains_financial_info": self.metadata.contains_financial_info,
            "years_mentioned": self.metadata.years_mentioned,
            "start_index": self.start_index,
        });

        HashMap::from([
            ("text".to_string(), serde_json::Value::String(self.text)),
            ("metadata".to_string(), metadata),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_layout_matches_collection_schema() {
        let mut chunk = Chunk::new("Revenue was $10 million", "report.pdf", 42);
        chunk.metadata.contains_financial_info = true;
        chunk.metadata.years_mentioned = vec![2022];

        let payload = chunk.into_payload();

        assert_eq!(payload["text"], serde_json::json!("Revenue was $10 million"));
        assert_eq!(
            payload["metadata"],
            serde_json::json!({
                "source": "report.pdf",
                "contains_financial_info": true,
                "years_mentioned": [2022],
                "start_index": 42,
            })
        );
    }
}
