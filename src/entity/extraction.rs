//! Batch extraction
//!
//! Runs the matcher over a whole batch in two phases separated by a hard
//! barrier: every document's explicit matches feed the thread context
//! first, then every document is resolved against the finished context.
//! Both phases fan out over the current rayon pool; results are collected
//! in document order so output never depends on scheduling.

use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use super::candidates::CandidateTracker;
use super::canonical::Canonicalizer;
use super::catalog::BrandCatalog;
use super::inference::ThreadBrandContext;
use super::matching::{DocMentions, DocScan, MentionMatcher};
use super::types::{CandidateToken, Document, Mention};
use super::TARGET_ENTITY;
use crate::ranking::display::pick_best_display;

#[derive(Debug, Clone, Default)]
pub struct ExtractionOutput {
    pub mentions: Vec<Mention>,
    pub candidates: Vec<CandidateToken>,
    pub documents: usize,
    pub skipped: usize,
    pub threads_with_brands: usize,
}

#[instrument(level = "debug", skip_all, fields(documents = docs.len()))]
pub fn extract_mentions(
    docs: &[Document],
    catalog: &BrandCatalog,
    canonicalizer: &Canonicalizer,
) -> ExtractionOutput {
    let matcher = MentionMatcher::new(catalog, canonicalizer);
    let skipped = docs.iter().filter(|d| d.is_blank()).count();

    // Phase 1: explicit matches and brand context
    let scans: Vec<DocScan> = docs.par_iter().map(|doc| matcher.scan(doc)).collect();
    let context = ThreadBrandContext::new();
    docs.par_iter()
        .zip(scans.par_iter())
        .for_each(|(doc, scan)| context.record(doc.thread_id(), &scan.brands));

    info!(
        target: TARGET_ENTITY,
        "Built brand context for {} threads from {} documents ({} blank)",
        context.thread_count(),
        docs.len(),
        skipped
    );

    // Phase 2: resolution against the finished context
    let resolved: Vec<DocMentions> = docs
        .par_iter()
        .zip(scans.par_iter())
        .map(|(doc, scan)| matcher.resolve(doc, scan, &context))
        .collect();

    let mut mentions = Vec::new();
    let mut tracker = CandidateTracker::new();
    for doc_out in resolved {
        mentions.extend(doc_out.mentions);
        tracker.merge(doc_out.candidates);
    }

    harmonize_display_names(&mut mentions);

    info!(
        target: TARGET_ENTITY,
        "Extracted {} mentions, {} candidate tokens",
        mentions.len(),
        tracker.len()
    );

    ExtractionOutput {
        mentions,
        candidates: tracker.report(),
        documents: docs.len(),
        skipped,
        threads_with_brands: context.thread_count(),
    }
}

/// Give every mention of one identity the same display name
pub fn harmonize_display_names(mentions: &mut [Mention]) {
    let mut by_key: HashMap<&str, HashMap<&str, usize>> = HashMap::new();
    for m in mentions.iter() {
        *by_key
            .entry(m.canonical_key.as_str())
            .or_default()
            .entry(m.canonical_model.as_str())
            .or_insert(0) += 1;
    }

    let chosen: HashMap<String, String> = by_key
        .into_iter()
        .filter_map(|(key, variants)| {
            pick_best_display(variants.into_iter()).map(|best| (key.to_string(), best))
        })
        .collect();

    for m in mentions.iter_mut() {
        if let Some(best) = chosen.get(&m.canonical_key) {
            if &m.canonical_model != best {
                debug!(
                    target: TARGET_ENTITY,
                    "Display '{}' -> '{}' for {}", m.canonical_model, best, m.canonical_key
                );
                m.canonical_model = best.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::aliases::AliasTable;
    use crate::entity::types::{DocKind, MentionMethod};

    fn docs() -> Vec<Document> {
        vec![
            Document::new("KEF Q150 vs Klipsch R-51M", DocKind::Post, "t3_a", "a", 12),
            Document::new("", DocKind::Comment, "t1_x", "a", 1),
            Document::new("the RP-600M bookshelf speakers?", DocKind::Comment, "t1_b", "a", 2),
            Document::new("kef q-150 here too", DocKind::Comment, "t1_c", "b", -1),
            Document::new("RP-600M speakers but no brand", DocKind::Post, "t3_d", "d", 4),
        ]
    }

    #[test]
    fn test_batch_extraction() {
        let catalog = BrandCatalog::default();
        let canonicalizer = Canonicalizer::new(AliasTable::new());
        let out = extract_mentions(&docs(), &catalog, &canonicalizer);

        assert_eq!(out.documents, 5);
        assert_eq!(out.skipped, 1);
        assert_eq!(out.threads_with_brands, 2);

        let keys: Vec<_> = out.mentions.iter().map(|m| m.canonical_key.as_str()).collect();
        // Thread "a" has KEF and KLIPSCH once each; KEF comes first in the catalog
        assert_eq!(keys, vec!["kefq150", "klipschr51m", "kefrp600m", "kefq150"]);
        assert_eq!(out.mentions[2].method, MentionMethod::InferredBrand);

        let rp = out.candidates.iter().find(|c| c.token == "RP-600M").unwrap();
        assert_eq!(rp.count, 2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let catalog = BrandCatalog::default();
        let canonicalizer = Canonicalizer::new(AliasTable::new());
        let input: Vec<Document> = docs().into_iter().cycle().take(200).collect();

        let parallel = extract_mentions(&input, &catalog, &canonicalizer);
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| extract_mentions(&input, &catalog, &canonicalizer));

        assert_eq!(parallel.mentions, single.mentions);
        assert_eq!(parallel.candidates, single.candidates);
    }

    #[test]
    fn test_harmonize_display_names() {
        let catalog = BrandCatalog::default();
        let mut aliases = AliasTable::new();
        aliases.insert("Q150B", "kef q150");
        let canonicalizer = Canonicalizer::new(aliases);
        let input = vec![
            Document::new("KEF Q150 today", DocKind::Post, "1", "a", 0),
            Document::new("KEF Q150 tomorrow", DocKind::Post, "2", "b", 0),
            Document::new("my Q150B, nice", DocKind::Post, "3", "c", 0),
        ];
        let out = extract_mentions(&input, &catalog, &canonicalizer);
        assert_eq!(out.mentions.len(), 3);
        assert_eq!(out.mentions[2].method, MentionMethod::AliasToken);
        assert!(out.mentions.iter().all(|m| m.canonical_key == "kefq150"));
        assert!(out.mentions.iter().all(|m| m.canonical_model == "KEF Q150"));
    }

    #[test]
    fn test_single_spelling_is_cleaned_too() {
        let catalog = BrandCatalog::default();
        let mut aliases = AliasTable::new();
        aliases.insert("Q150B", "kef q150");
        let canonicalizer = Canonicalizer::new(aliases);
        let input = vec![Document::new("my Q150B, nice", DocKind::Post, "1", "a", 0)];

        let out = extract_mentions(&input, &catalog, &canonicalizer);
        assert_eq!(out.mentions.len(), 1);
        assert_eq!(out.mentions[0].canonical_model, "KEF Q150");
    }
}
