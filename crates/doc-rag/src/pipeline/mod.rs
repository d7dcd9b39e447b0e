//! End-to-end flows built from the providers and core components

pub mod knowledge_base;
pub mod orchestrator;
pub mod session;
pub mod teardown;

pub use knowledge_base::process_questions;
pub use orchestrator::{IngestOutcome, IngestState, IngestTarget, IngestionOrchestrator};
pub use session::EvaluationSession;
pub use teardown::{clear_bucket, clear_vector_index};
