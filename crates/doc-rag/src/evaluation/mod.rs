//! Question loading and answer scoring

pub mod questions;
pub mod scoring;

pub use questions::{parse_questions, Question};
pub use scoring::{Scorer, TokenOverlapScorer};

use serde::{Deserialize, Serialize};

/// Text generated answers are scored against
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTarget {
    /// The question itself. Measures topical overlap only, not correctness.
    #[default]
    Question,
    /// The reference answer from the second CSV column, falling back to the question
    Reference,
}

impl ScoreTarget {
    /// Comparison text for a question under this target
    pub fn comparison_text<'a>(&self, question: &'a Question) -> &'a str {
        match self {
            Self::Question => &question.text,
            Self::Reference => question.reference.as_deref().unwrap_or(&question.text),
        }
    }
}
