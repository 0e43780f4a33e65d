//! Final ranking over aggregated identities

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::aggregate::{merge_aggregates, VoteAggregate};
use super::TARGET_RANKING;
use crate::entity::canonical::Canonicalizer;

/// Bonus per distinct thread: breadth of discussion beats one busy thread
pub const THREAD_WEIGHT: f64 = 0.75;
pub const MENTION_WEIGHT: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub rank: usize,
    pub canonical_model: String,
    pub canonical_key: String,
    pub score: f64,
    pub vote_score: f64,
    pub unique_threads: usize,
    pub mentions: usize,
    pub avg_vote: f64,
    pub avg_doc_score: f64,
}

pub fn entity_score(vote_score: f64, unique_threads: usize, mentions: usize) -> f64 {
    vote_score + THREAD_WEIGHT * unique_threads as f64 + MENTION_WEIGHT * mentions as f64
}

/// Pass every aggregate's spellings through the canonicalizer again, so
/// alias entries added after scoring still fold identities together. Only
/// an alias hit on the display moves an aggregate to another key; the key
/// it already carries may be an explicit alias override.
pub fn renormalize(aggregates: Vec<VoteAggregate>, canonicalizer: &Canonicalizer) -> Vec<VoteAggregate> {
    let rekeyed = aggregates.into_iter().map(|mut agg| {
        if let Some(record) = canonicalizer.alias_for(&agg.display_name()) {
            if record.canonical_key != agg.canonical_key {
                debug!(
                    target: TARGET_RANKING,
                    "Rekeyed {} -> {}", agg.canonical_key, record.canonical_key
                );
                agg.canonical_key = record.canonical_key.clone();
            }
        }

        let mut variants = BTreeMap::new();
        for (raw, count) in std::mem::take(&mut agg.variants) {
            let display = canonicalizer.normalize(&raw).display;
            let display = if display.is_empty() { raw } else { display };
            *variants.entry(display).or_insert(0) += count;
        }
        agg.variants = variants;
        agg
    });
    merge_aggregates(rekeyed)
}

fn ranking_order(a: &RankedEntity, b: &RankedEntity) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.canonical_model.cmp(&b.canonical_model))
        .then_with(|| a.canonical_key.cmp(&b.canonical_key))
}

/// Score and order identities. Partial aggregates of the same key are
/// merged first; ties break on display name, then key.
pub fn rank_aggregates<I>(aggregates: I) -> Vec<RankedEntity>
where
    I: IntoIterator<Item = VoteAggregate>,
{
    let mut ranked: Vec<RankedEntity> = merge_aggregates(aggregates)
        .into_iter()
        .map(|agg| RankedEntity {
            rank: 0,
            canonical_model: agg.display_name(),
            score: entity_score(agg.vote_score, agg.unique_threads(), agg.mentions),
            vote_score: agg.vote_score,
            unique_threads: agg.unique_threads(),
            mentions: agg.mentions,
            avg_vote: agg.avg_vote(),
            avg_doc_score: agg.avg_doc_score(),
            canonical_key: agg.canonical_key,
        })
        .collect();

    ranked.sort_by(ranking_order);
    for (i, entity) in ranked.iter_mut().enumerate() {
        entity.rank = i + 1;
    }

    info!(target: TARGET_RANKING, "Ranked {} identities", ranked.len());
    ranked
}
