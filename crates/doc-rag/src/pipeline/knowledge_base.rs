//! Questions answered by a managed knowledge base

use crate::generation::PromptBuilder;
use crate::providers::KnowledgeBaseService;
use crate::types::KnowledgeBaseAnswer;

/// Ask each question in order; failures are logged and kept as error entries
pub async fn process_questions(
    service: &dyn KnowledgeBaseService,
    questions: &[String],
    knowledge_base_id: &str,
    model_id: &str,
) -> Vec<KnowledgeBaseAnswer> {
    let mut answers = Vec::with_capacity(questions.len());
    for question in questions {
        let query = PromptBuilder::knowledge_base_query(question);
        match service
            .retrieve_and_generate(&query, knowledge_base_id, model_id)
            .await
        {
            Ok(answer) => answers.push(KnowledgeBaseAnswer {
                question: question.clone(),
                answer: Some(answer),
                error: None,
            }),
            Err(e) => {
                tracing::error!("Knowledge base query failed for {:?}: {}", question, e);
                answers.push(KnowledgeBaseAnswer {
                    question: question.clone(),
                    answer: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    answers
}
