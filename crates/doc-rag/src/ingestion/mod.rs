//! Source text extraction for Office documents and text artifacts

mod extractor;
mod parser;

pub use extractor::{read_extracts, split_extracts};
pub use parser::{FileParser, ParsedDocument};
