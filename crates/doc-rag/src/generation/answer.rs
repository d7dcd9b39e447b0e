//! Retrieval and per-extract answer generation

use std::sync::Arc;

use super::prompt::PromptBuilder;
use crate::error::Result;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::FlatIndex;
use crate::types::{GenerationFailure, QuestionAnswerResult};

/// Answers a question once per retrieved extract
pub struct AnswerGenerator {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl AnswerGenerator {
    /// Create a generator; `top_k` extracts are retrieved per question
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, llm: Arc<dyn LlmProvider>, top_k: usize) -> Self {
        Self { embedder, llm, top_k }
    }

    /// Retrieve the nearest extracts and generate one answer for each
    ///
    /// Generation failures are recorded per extract and skipped. Failing to
    /// embed the question fails the whole question.
    pub async fn answer(
        &self,
        question: &str,
        index: &FlatIndex,
        extracts: &[String],
    ) -> Result<QuestionAnswerResult> {
        let query = self.embedder.embed(question).await?;
        let neighbors = index.search(&query, self.top_k)?;

        let mut result = QuestionAnswerResult::new(question);
        for neighbor in neighbors {
            result.retrieved.push(neighbor.position);

            let Some(extract) = extracts.get(neighbor.position) else {
                tracing::error!("Index position {} has no extract", neighbor.position);
                result.failures.push(GenerationFailure {
                    extract_index: neighbor.position,
                    error: "extract missing for index position".to_string(),
                });
                continue;
            };

            let system = PromptBuilder::context_prompt(extract, question);
            match self.llm.generate(&system, question).await {
                Ok(answer) => result.answers.push(answer.trim().to_string()),
                Err(e) => {
                    tracing::error!(
                        "Generation failed for extract {}: {}",
                        neighbor.position,
                        e
                    );
                    result.failures.push(GenerationFailure {
                        extract_index: neighbor.position,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            "Question answered from {} extracts ({} failures)",
            result.answers.len(),
            result.failures.len()
        );
        Ok(result)
    }
}
