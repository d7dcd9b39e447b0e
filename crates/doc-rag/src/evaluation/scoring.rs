//! Precision / recall / F1 of generated answers

use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::types::Scores;

/// Scores a set of candidate answers against one comparison text
pub trait Scorer: Send + Sync {
    /// Mean scores over all candidates; all zeros when there are none
    fn score(&self, candidates: &[String], reference: &str) -> Scores;
}

/// Lowercased word-token overlap with clipped counts
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlapScorer;

impl TokenOverlapScorer {
    fn tokens(text: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for word in text.unicode_words() {
            *counts.entry(word.to_lowercase()).or_insert(0) += 1;
        }
        counts
    }

    fn pair(candidate: &HashMap<String, usize>, reference: &HashMap<String, usize>) -> Scores {
        let cand_total: usize = candidate.values().sum();
        let ref_total: usize = reference.values().sum();
        if cand_total == 0 || ref_total == 0 {
            return Scores::default();
        }

        let overlap: usize = candidate
            .iter()
            .map(|(token, count)| (*count).min(reference.get(token).copied().unwrap_or(0)))
            .sum();

        let precision = overlap as f32 / cand_total as f32;
        let recall = overlap as f32 / ref_total as f32;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Scores { precision, recall, f1 }
    }
}

impl Scorer for TokenOverlapScorer {
    fn score(&self, candidates: &[String], reference: &str) -> Scores {
        if candidates.is_empty() {
            return Scores::default();
        }
        let reference = Self::tokens(reference);

        let mut sum = Scores::default();
        for candidate in candidates {
            let s = Self::pair(&Self::tokens(candidate), &reference);
            sum.precision += s.precision;
            sum.recall += s.recall;
            sum.f1 += s.f1;
        }

        let n = candidates.len() as f32;
        Scores {
            precision: sum.precision / n,
            recall: sum.recall / n,
            f1: sum.f1 / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_identical() {
        let s = TokenOverlapScorer.score(&["The pump runs".to_string()], "the PUMP runs");
        assert!(close(s.precision, 1.0));
        assert!(close(s.recall, 1.0));
        assert!(close(s.f1, 1.0));
    }

    #[test]
    fn test_disjoint_and_empty() {
        let s = TokenOverlapScorer.score(&["alpha beta".to_string()], "gamma");
        assert_eq!(s, Scores::default());

        assert_eq!(TokenOverlapScorer.score(&[], "anything"), Scores::default());
        assert_eq!(
            TokenOverlapScorer.score(&["".to_string()], "anything"),
            Scores::default()
        );
    }

    #[test]
    fn test_mean_over_candidates() {
        let candidates = vec!["a b".to_string(), "c d".to_string()];
        let s = TokenOverlapScorer.score(&candidates, "a b");
        assert!(close(s.precision, 0.5));
        assert!(close(s.recall, 0.5));
        assert!(close(s.f1, 0.5));
    }

    #[test]
    fn test_partial_overlap_clipped() {
        // "a a a" vs "a b": overlap 1, precision 1/3, recall 1/2
        let s = TokenOverlapScorer.score(&["a a a".to_string()], "a b");
        assert!(close(s.precision, 1.0 / 3.0));
        assert!(close(s.recall, 0.5));
        assert!(close(s.f1, 0.4));
    }
}
