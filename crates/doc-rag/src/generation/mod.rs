//! Answer generation over retrieved extracts

pub mod answer;
pub mod prompt;

pub use answer::AnswerGenerator;
pub use prompt::PromptBuilder;
