//! Grounded answer generation.
//!
//! Formats retrieved documents into a deterministic context block, fills one
//! of three static prompt templates, and invokes the completion provider.
//! With zero documents each operation returns a fixed sentinel instead of
//! calling the LLM; a provider failure is converted into an explanatory
//! answer string. The error becomes the user-visible answer, never an
//! exception on the request path.

mod templates;

use crate::TRACING_TARGET;
use crate::provider::CompletionProvider;
use crate::retriever::Document;

/// Answer returned when no documents are available to ground a response.
pub const INSUFFICIENT_INFORMATION: &str =
    "I don't have enough information to answer that question.";

/// Answer returned when no financial documents are available to summarize.
pub const NO_FINANCIAL_INFORMATION: &str =
    "No financial information is available to summarize.";

/// Generates responses grounded in retrieved context.
pub struct Generator {
    provider: CompletionProvider,
}

impl Generator {
    /// Creates a generator over the given completion provider.
    pub fn new(provider: CompletionProvider) -> Self {
        Self { provider }
    }

    /// Returns the completion provider.
    pub fn provider(&self) -> &CompletionProvider {
        &self.provider
    }

    /// Formats retrieved documents into the context block.
    ///
    /// Documents are numbered from 1 in input order (the retriever's
    /// ranking), each rendered as `[Document i from <source>]` followed by
    /// its content, joined with blank lines.
    pub fn format_context(documents: &[Document]) -> String {
        documents
            .iter()
            .enumerate()
            .map(|(i, doc)| format!("[Document {} from {}]\n{}\n", i + 1, doc.source, doc.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Generates an answer to `query` grounded in `documents`.
    pub async fn generate_response(&self, query: &str, documents: &[Document]) -> String {
        if documents.is_empty() {
            return INSUFFICIENT_INFORMATION.to_string();
        }

        let prompt = templates::QA_TEMPLATE
            .replace("{context}", &Self::format_context(documents))
            .replace("{question}", query);

        match self.provider.complete(&prompt).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Error generating response"
                );
                format!("An error occurred while generating the response: {error}")
            }
        }
    }

    /// Generates an answer to the latest `query` given `documents` and the
    /// prior conversation rendered as text.
    pub async fn generate_conversational_response(
        &self,
        query: &str,
        documents: &[Document],
        conversation_history: &str,
    ) -> String {
        if documents.is_empty() {
            return INSUFFICIENT_INFORMATION.to_string();
        }

        let prompt = templates::CONVERSATIONAL_QA_TEMPLATE
            .replace("{conversation_history}", conversation_history)
            .replace("{context}", &Self::format_context(documents))
            .replace("{question}", query);

        match self.provider.complete(&prompt).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Error generating conversational response"
                );
                format!("An error occurred while generating the response: {error}")
            }
        }
    }

    /// Summarizes the financial content of `documents`.
    pub async fn generate_financial_summary(&self, documents: &[Document]) -> String {
        if documents.is_empty() {
            return NO_FINANCIAL_INFORMATION.to_string();
        }

        let prompt = templates::FINANCIAL_SUMMARY_TEMPLATE
            .replace("{context}", &Self::format_context(documents));

        match self.provider.complete(&prompt).await {
            Ok(response) => response,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(content: &str, source: &str, score: f32) -> Document {
        Document {
            content: content.to_string(),
            source: source.to_string(),
            score,
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn context_numbers_documents_in_ranking_order() {
        let documents = vec![
            document("Revenue was $10 million.", "annual_report_2022.pdf", 0.95),
            document("Expenses rose to $6 million.", "annual_report_2022.pdf", 0.90),
        ];

        let context = Generator::format_context(&documents);

        assert_eq!(
            context,
            "[Document 1 from annual_report_2022.pdf]\nRevenue was $10 million.\n\n\
             [Document 2 from annual_report_2022.pdf]\nExpenses rose to $6 million.\n"
        );
    }

    #[test]
    fn context_of_no_documents_is_empty() {
        assert_eq!(Generator::format_context(&[]), "");
    }

    #[tokio::test]
    async fn empty_documents_return_sentinel_without_calling_the_model() {
        let provider = CompletionProvider::fixed("never");
        let generator = Generator::new(provider.clone());

        let answer = generator.generate_response("what happened?", &[]).await;
        assert_eq!(answer, INSUFFICIENT_INFORMATION);

        let answer = generator
            .generate_conversational_response("what happened?", &[], "User: hi")
            .await;
        assert_eq!(answer, INSUFFICIENT_INFORMATION);

        let summary = generator.generate_financial_summary(&[]).await;
        assert_eq!(summary, NO_FINANCIAL_INFORMATION);

        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn grounded_generation_invokes_the_model_once() {
        let provider = CompletionProvider::fixed("Revenue was $10 million in 2022.");
        let generator = Generator::new(provider.clone());
        let documents = vec![document("Revenue was $10 million.", "report.pdf", 0.9)];

        let answer = generator
            .generate_response("What was the 2022 revenue?", &documents)
            .await;

        assert_eq!(answer, "Revenue was $10 million in 2022.");
        assert_eq!(provider.calls(), 1);
    }
}
