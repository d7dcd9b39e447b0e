//! Split a text artifact into extracts

use std::path::Path;

use crate::error::Result;

/// Read an artifact as one extract per line
///
/// Line terminators (`\n` or `\r\n`) are removed and nothing else is changed,
/// so blank lines stay as empty extracts and positions match line numbers.
pub async fn read_extracts(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(split_extracts(&content))
}

/// Split text into extracts, one per line
pub fn split_extracts(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}
