//! Per-identity vote aggregation
//!
//! A [`VoteAggregate`] keeps enough raw state (sums, the set of thread ids,
//! spelling counts) that partial aggregates over disjoint slices of the
//! mentions merge into exactly the aggregate of the whole.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::display::{pick_best_display, variants_summary};
use super::weight::vote_weight;
use super::TARGET_RANKING;
use crate::entity::types::Mention;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VoteAggregate {
    pub canonical_key: String,
    /// Raw display spelling -> mention count
    pub variants: BTreeMap<String, usize>,
    pub thread_ids: BTreeSet<String>,
    pub mentions: usize,
    pub vote_score: f64,
    /// Sum of raw document scores, for the mean
    pub doc_score_sum: f64,
}

impl VoteAggregate {
    pub fn new(canonical_key: impl Into<String>) -> Self {
        Self {
            canonical_key: canonical_key.into(),
            ..Default::default()
        }
    }

    pub fn from_mention(mention: &Mention) -> Self {
        let mut agg = Self::new(mention.canonical_key.clone());
        agg.add(mention);
        agg
    }

    pub fn add(&mut self, mention: &Mention) {
        let provenance = &mention.provenance;
        *self
            .variants
            .entry(mention.canonical_model.clone())
            .or_insert(0) += 1;
        if !provenance.thread_id.is_empty() {
            self.thread_ids.insert(provenance.thread_id.clone());
        }
        self.mentions += 1;
        self.vote_score += vote_weight(provenance.score, provenance.doc_kind);
        self.doc_score_sum += provenance.score as f64;
    }

    /// Fold in a partial aggregate of the same identity
    pub fn merge(&mut self, other: VoteAggregate) {
        for (variant, count) in other.variants {
            *self.variants.entry(variant).or_insert(0) += count;
        }
        self.thread_ids.extend(other.thread_ids);
        self.mentions += other.mentions;
        self.vote_score += other.vote_score;
        self.doc_score_sum += other.doc_score_sum;
    }

    pub fn unique_threads(&self) -> usize {
        self.thread_ids.len()
    }

    pub fn avg_vote(&self) -> f64 {
        if self.mentions == 0 {
            return 0.0;
        }
        self.vote_score / self.mentions as f64
    }

    pub fn avg_doc_score(&self) -> f64 {
        if self.mentions == 0 {
            return 0.0;
        }
        self.doc_score_sum / self.mentions as f64
    }

    pub fn display_name(&self) -> String {
        pick_best_display(self.variants.iter().map(|(v, c)| (v.as_str(), *c)))
            .unwrap_or_else(|| self.canonical_key.to_uppercase())
    }

    pub fn variants_summary(&self) -> String {
        variants_summary(&self.variants)
    }
}

/// Group mentions by canonical key. Output is in key order; sums are taken
/// in input order so repeated runs produce identical floats.
pub fn aggregate_mentions(mentions: &[Mention]) -> Vec<VoteAggregate> {
    let mut groups: BTreeMap<&str, VoteAggregate> = BTreeMap::new();
    for mention in mentions {
        if mention.canonical_key.is_empty() {
            continue;
        }
        groups
            .entry(mention.canonical_key.as_str())
            .or_insert_with(|| VoteAggregate::new(mention.canonical_key.clone()))
            .add(mention);
    }

    debug!(
        target: TARGET_RANKING,
        "Aggregated {} mentions into {} identities",
        mentions.len(),
        groups.len()
    );
    groups.into_values().collect()
}

/// Merge partial aggregates sharing a canonical key
pub fn merge_aggregates<I>(parts: I) -> Vec<VoteAggregate>
where
    I: IntoIterator<Item = VoteAggregate>,
{
    let mut groups: BTreeMap<String, VoteAggregate> = BTreeMap::new();
    for part in parts {
        if part.canonical_key.is_empty() {
            continue;
        }
        match groups.get_mut(&part.canonical_key) {
            Some(existing) => existing.merge(part),
            None => {
                groups.insert(part.canonical_key.clone(), part);
            }
        }
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::types::{DocKind, MentionMethod, Provenance};

    fn mention(key: &str, display: &str, thread: &str, score: i64, kind: DocKind) -> Mention {
        Mention {
            canonical_key: key.to_string(),
            canonical_model: display.to_string(),
            brand: "KEF".to_string(),
            model_token: "Q150".to_string(),
            found_text: display.to_string(),
            method: MentionMethod::BrandToken,
            confidence: 1.0,
            provenance: Provenance {
                doc_kind: kind,
                thread_id: thread.to_string(),
                score,
                ..Default::default()
            },
        }
    }

    fn sample() -> Vec<Mention> {
        vec![
            mention("kefq150", "KEF Q150", "a", 10, DocKind::Post),
            mention("kefq150", "kef q150", "a", 3, DocKind::Comment),
            mention("kefq150", "KEF Q150", "b", -2, DocKind::Comment),
            mention("klipschr51m", "KLIPSCH R-51M", "a", 0, DocKind::Comment),
            mention("kefq150", "KEF Q150", "c", 7, DocKind::Comment),
            mention("klipschr51m", "KLIPSCH R51M", "d", 1, DocKind::Post),
        ]
    }

    fn assert_same(a: &[VoteAggregate], b: &[VoteAggregate]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert_eq!(x.canonical_key, y.canonical_key);
            assert_eq!(x.variants, y.variants);
            assert_eq!(x.thread_ids, y.thread_ids);
            assert_eq!(x.mentions, y.mentions);
            assert!((x.vote_score - y.vote_score).abs() < 1e-9);
            assert!((x.avg_vote() - y.avg_vote()).abs() < 1e-9);
            assert!((x.avg_doc_score() - y.avg_doc_score()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_post_mention() {
        let aggs = aggregate_mentions(&[mention("kefq150", "KEF Q150", "a", 10, DocKind::Post)]);
        assert_eq!(aggs.len(), 1);
        let agg = &aggs[0];
        assert_eq!(agg.mentions, 1);
        assert_eq!(agg.unique_threads(), 1);
        assert!((agg.vote_score - (1.0 + 11f64.ln()) * 1.35).abs() < 1e-9);
        assert!((agg.avg_doc_score() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_grouping() {
        let aggs = aggregate_mentions(&sample());
        assert_eq!(aggs.len(), 2);

        let kef = &aggs[0];
        assert_eq!(kef.canonical_key, "kefq150");
        assert_eq!(kef.mentions, 4);
        assert_eq!(kef.unique_threads(), 3);
        assert!((kef.avg_doc_score() - 4.5).abs() < 1e-9);
        assert_eq!(kef.display_name(), "KEF Q150");
        assert_eq!(kef.variants_summary(), "KEF Q150 (3) | kef q150 (1)");

        let klipsch = &aggs[1];
        assert_eq!(klipsch.unique_threads(), 2);
        assert_eq!(klipsch.display_name(), "KLIPSCH R-51M");
    }

    #[test]
    fn test_partition_merge_matches_whole() {
        let all = sample();
        let whole = aggregate_mentions(&all);
        for split in 0..=all.len() {
            let (left, right) = all.split_at(split);
            let merged = merge_aggregates(
                aggregate_mentions(right)
                    .into_iter()
                    .chain(aggregate_mentions(left)),
            );
            assert_same(&merged, &whole);
        }
    }

    #[test]
    fn test_merge_counts_shared_threads_once() {
        let mut a = VoteAggregate::from_mention(&mention("k", "K", "t1", 0, DocKind::Comment));
        let b = VoteAggregate::from_mention(&mention("k", "K", "t1", 0, DocKind::Comment));
        a.merge(b);
        assert_eq!(a.mentions, 2);
        assert_eq!(a.unique_threads(), 1);
    }

    #[test]
    fn test_empty_keys_and_input() {
        assert!(aggregate_mentions(&[]).is_empty());
        assert!(aggregate_mentions(&[mention("", "", "a", 1, DocKind::Post)]).is_empty());
        assert_eq!(VoteAggregate::new("x").avg_vote(), 0.0);
    }
}
