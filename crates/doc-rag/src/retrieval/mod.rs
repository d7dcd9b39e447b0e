//! Extract embedding and nearest-neighbor retrieval

pub mod builder;
pub mod index;

pub use builder::{BatchEmbeddingReport, EmbeddingFailure, IndexBuilder};
pub use index::{FlatIndex, Neighbor};
