//! Text cleaning passes applied to every string leaf of a record

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const BULLETS: &str = "\u{0095}\u{2022}\u{2023}\u{2043}\u{3164}\u{204C}\u{204D}\u{2219}\u{25CB}\u{25CF}\u{25D8}\u{25E6}\u{2619}\u{2765}\u{2767}\u{29BE}\u{29BF}\u{00B7}\u{25AA}\u{25A0}\u{25A1}\u{25AB}\u{25B8}\u{25B9}\u{25BA}\u{25BB}\u{25B6}\u{25B7}\u{25C6}\u{25C7}\u{27A2}\u{27A4}\u{2794}\\-\\*";

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^\s*[{}]", BULLETS)).expect("Invalid regex")
    })
}

fn paragraph_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\s*\n\s*\n\s*").expect("Invalid regex")
    })
}

const DASHES: [char; 5] = ['-', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}'];

const QUOTE_REPLACEMENTS: [(&str, &str); 12] = [
    ("\u{0091}", "'"),
    ("\u{0092}", "'"),
    ("\u{0093}", "\""),
    ("\u{0094}", "\""),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("\u{201A}", "'"),
    ("\u{201C}", "\""),
    ("\u{201D}", "\""),
    ("\u{201E}", "\""),
    ("&apos;", "'"),
    ("\u{00E2}\u{20AC}\u{2122}", "'"),
];

/// Drop a single leading bullet marker
pub fn clean_bullets(text: &str) -> String {
    if !bullet_re().is_match(text) {
        return text.to_string();
    }
    bullet_re().replace(text, "").trim().to_string()
}

/// Collapse every whitespace run to one space and trim
pub fn clean_extra_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace dashes with spaces
pub fn clean_dashes(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if DASHES.contains(&c) { ' ' } else { c })
        .collect();
    if replaced == text {
        return text.trim().to_string();
    }
    // Replacement must not leave doubled spaces behind
    clean_extra_whitespace(&replaced)
}

/// Trim and strip trailing `.,:;`, including runs separated by spaces
pub fn clean_trailing_punctuation(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ':' | ';') || c.is_whitespace())
        .to_string()
}

/// Replace typographic and mis-decoded quotes with ASCII ones
pub fn replace_unicode_quotes(text: &str) -> String {
    let mut out = text.to_string();
    for (from, to) in QUOTE_REPLACEMENTS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}

/// Merge lines broken inside a paragraph
///
/// Paragraphs are separated by blank lines. A paragraph made only of short
/// lines (under five words) keeps each line as its own paragraph.
pub fn group_broken_paragraphs(text: &str) -> String {
    let mut paragraphs = Vec::new();
    for paragraph in paragraph_split_re().split(text) {
        if paragraph.trim().is_empty() {
            continue;
        }
        let lines: Vec<&str> = paragraph.lines().collect();
        let all_short = lines
            .iter()
            .all(|l| l.trim().split(' ').count() < 5);
        if all_short {
            paragraphs.extend(
                lines
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            );
        } else {
            paragraphs.push(
                lines
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }
    }
    paragraphs.join("\n\n")
}

/// Clean one string: the combined pass, then each individual pass
pub fn clean_text(text: &str) -> String {
    let combined = clean_bullets(&clean_extra_whitespace(&clean_dashes(
        &clean_trailing_punctuation(text),
    )));
    let combined = combined.trim();

    let text = clean_bullets(combined);
    let text = clean_extra_whitespace(&text);
    let text = clean_dashes(&text);
    let text = clean_trailing_punctuation(&text);
    let text = replace_unicode_quotes(&text);
    group_broken_paragraphs(&text)
}

/// Apply [`clean_text`] to every string leaf, leaving keys and non-strings untouched
pub fn clean_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, clean_value(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_text_example() {
        assert_eq!(clean_text("  Hello,   World!-- "), "Hello, World!");
    }

    #[test]
    fn test_individual_passes() {
        assert_eq!(clean_bullets("\u{2022} First point"), "First point");
        assert_eq!(clean_bullets("no bullet"), "no bullet");
        assert_eq!(clean_extra_whitespace("a\u{00A0}\n b\t\tc "), "a b c");
        assert_eq!(clean_dashes("ISO-9001 \u{2013} part"), "ISO 9001 part");
        assert_eq!(clean_trailing_punctuation(" end.;, "), "end");
        assert_eq!(
            replace_unicode_quotes("\u{201C}quoted\u{201D} it\u{2019}s"),
            "\"quoted\" it's"
        );
    }

    #[test]
    fn test_group_broken_paragraphs() {
        let text = "The pump must be serviced\nevery year by a technician.\n\nShort\nlines";
        assert_eq!(
            group_broken_paragraphs(text),
            "The pump must be serviced every year by a technician.\n\nShort\n\nlines"
        );
        assert_eq!(group_broken_paragraphs("single line"), "single line");
    }

    #[test]
    fn test_clean_text_invariants() {
        for input in [
            "  Hello,   World!-- ",
            "\u{2022} Item one;",
            "Part-No. 42 - Valve",
            "a\n\n\nb",
            "",
            "---",
            "end. .",
        ] {
            let cleaned = clean_text(input);
            assert_eq!(cleaned, cleaned.trim(), "untrimmed output for {:?}", input);
            assert!(!cleaned.contains("  "), "double space for {:?}", input);
            assert!(
                !cleaned.ends_with(['.', ',', ':', ';']),
                "trailing punctuation for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_clean_value_recursive() {
        let value = json!({
            "text": "  Hello,   World!-- ",
            "metadata": {"languages": ["eng "], "page": 3, "tags": [" a. ", null]}
        });
        let cleaned = clean_value(value);
        assert_eq!(cleaned["text"], "Hello, World!");
        assert_eq!(cleaned["metadata"]["languages"][0], "eng");
        assert_eq!(cleaned["metadata"]["page"], 3);
        assert_eq!(cleaned["metadata"]["tags"], json!(["a", null]));
    }
}
