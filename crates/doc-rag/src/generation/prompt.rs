//! Prompt templates for extract-grounded answers

/// Prompt builder for per-extract generation
pub struct PromptBuilder;

impl PromptBuilder {
    /// System instruction grounding the answer in one extract
    pub fn context_prompt(extract: &str, question: &str) -> String {
        format!(
            "Based on the following context, answer the question:\n\nContext: {}\n\nQuestion: {}",
            extract, question
        )
    }

    /// Question text sent to a managed knowledge base
    pub fn knowledge_base_query(question: &str) -> String {
        question.trim().to_string()
    }
}
