//! Google Cloud providers
//!
//! - Cloud Storage as an object store
//! - Vertex AI RAG Engine as a managed knowledge base

mod auth;
mod gcs_store;
mod rag_engine;

pub use auth::GcpAuth;
pub use gcs_store::GcsObjectStore;
pub use rag_engine::VertexRagEngine;
