use std::collections::HashMap;

use super::normalizer::collapse_whitespace;
use super::types::CandidateToken;

pub const MAX_EXAMPLES: usize = 3;
pub const MAX_SNIPPET_CHARS: usize = 220;

/// Standalone tokens seen during a run, with a few example snippets for
/// whoever curates the alias table. Never feeds back into resolution.
#[derive(Debug, Clone, Default)]
pub struct CandidateTracker {
    tokens: HashMap<String, (usize, Vec<String>)>,
}

impl CandidateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, token: &str, raw_text: &str) {
        let entry = self.tokens.entry(token.to_string()).or_default();
        entry.0 += 1;
        if entry.1.len() < MAX_EXAMPLES {
            entry.1.push(snippet(raw_text));
        }
    }

    /// Fold another tracker in. Examples from `self` come first, so merging
    /// per-document trackers in document order keeps the report stable.
    pub fn merge(&mut self, other: CandidateTracker) {
        for (token, (count, examples)) in other.tokens {
            let entry = self.tokens.entry(token).or_default();
            entry.0 += count;
            let room = MAX_EXAMPLES.saturating_sub(entry.1.len());
            entry.1.extend(examples.into_iter().take(room));
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Most frequent first; equal counts in token order
    pub fn report(&self) -> Vec<CandidateToken> {
        let mut rows: Vec<CandidateToken> = self
            .tokens
            .iter()
            .map(|(token, (count, examples))| CandidateToken {
                token: token.clone(),
                count: *count,
                examples: examples.clone(),
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.token.cmp(&b.token)));
        rows
    }
}

fn snippet(raw_text: &str) -> String {
    collapse_whitespace(raw_text)
        .chars()
        .take(MAX_SNIPPET_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_example_cap() {
        let mut tracker = CandidateTracker::new();
        for i in 0..5 {
            tracker.observe("RP-600M", &format!("post   number\n{}", i));
        }
        tracker.observe("Q150", "one");

        let report = tracker.report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].token, "RP-600M");
        assert_eq!(report[0].count, 5);
        assert_eq!(
            report[0].examples,
            vec!["post number 0", "post number 1", "post number 2"]
        );
        assert_eq!(report[1].count, 1);
    }

    #[test]
    fn test_snippets_are_truncated_on_char_boundaries() {
        let mut tracker = CandidateTracker::new();
        tracker.observe("X100", &"é".repeat(500));
        let example = &tracker.report()[0].examples[0];
        assert_eq!(example.chars().count(), MAX_SNIPPET_CHARS);
    }

    #[test]
    fn test_merge_keeps_earlier_examples_first() {
        let mut first = CandidateTracker::new();
        first.observe("R-51M", "a");
        first.observe("R-51M", "b");

        let mut second = CandidateTracker::new();
        second.observe("R-51M", "c");
        second.observe("R-51M", "d");
        second.observe("SB1000", "e");

        first.merge(second);
        let report = first.report();
        assert_eq!(report[0].token, "R-51M");
        assert_eq!(report[0].count, 4);
        assert_eq!(report[0].examples, vec!["a", "b", "c"]);
        assert_eq!(report[1].token, "SB1000");
    }

    #[test]
    fn test_ties_sorted_by_token() {
        let mut tracker = CandidateTracker::new();
        tracker.observe("ZX10", "z");
        tracker.observe("AB10", "a");
        let tokens: Vec<_> = tracker.report().into_iter().map(|c| c.token).collect();
        assert_eq!(tokens, vec!["AB10", "ZX10"]);
    }
}
