//! Questions CSV loading

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A question with an optional reference answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question text from the first column
    pub text: String,
    /// Reference answer from the second column, when present and not blank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Read questions from CSV bytes
///
/// The first row is a header. Rows whose first cell is blank are skipped.
/// Rows may have any number of columns.
pub fn parse_questions(data: &[u8]) -> Result<Vec<Question>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let mut questions = Vec::new();
    for row in reader.records() {
        let row = row?;
        let text = match row.get(0).map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => continue,
        };
        let reference = row
            .get(1)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        questions.push(Question { text, reference });
    }

    tracing::debug!("Loaded {} questions", questions.len());
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_column_header_skipped() {
        let csv = "question,notes\nWhat is X?,ignored\n,\nHow many pumps?\n";
        let questions = parse_questions(csv.as_bytes()).unwrap();
        let texts: Vec<_> = questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["What is X?", "How many pumps?"]);
        assert_eq!(questions[0].reference.as_deref(), Some("ignored"));
        assert_eq!(questions[1].reference, None);
    }

    #[test]
    fn test_quoted_cells() {
        let csv = "q\n\"Is it safe, really?\"\n";
        let questions = parse_questions(csv.as_bytes()).unwrap();
        assert_eq!(questions[0].text, "Is it safe, really?");
    }

    #[test]
    fn test_header_only() {
        assert!(parse_questions(b"question\n").unwrap().is_empty());
        assert!(parse_questions(b"").unwrap().is_empty());
    }
}
