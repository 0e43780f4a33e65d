//! Two-pass mention matcher
//!
//! Pass 1 finds explicit `BRAND model` pairs. Pass 2 rescans the same text
//! for model tokens on their own and resolves them through the alias table
//! or, behind the speaker-context gate, through brand inference.
//!
//! Scanning is split so a batch can build its thread context from every
//! document's pass-1 results before any pass-2 decision is made:
//! [`MentionMatcher::scan`] is the context phase, [`MentionMatcher::resolve`]
//! the resolution phase.

use std::ops::Range;
use tracing::debug;

use super::candidates::CandidateTracker;
use super::canonical::{Canonicalizer, Identity};
use super::catalog::BrandCatalog;
use super::inference::{BrandCounter, ThreadBrandContext};
use super::normalizer::{normalize_brand, normalize_display, normalize_for_matching};
use super::types::{Document, Mention, MentionCandidate, MentionMethod};
use super::TARGET_ENTITY;

/// Context-phase output for one document
#[derive(Debug, Clone, Default)]
pub struct DocScan {
    pub text: String,
    pub explicit: Vec<(Range<usize>, MentionCandidate)>,
    pub brands: BrandCounter,
}

/// Everything the resolution phase produced for one document
#[derive(Debug, Clone, Default)]
pub struct DocMentions {
    pub mentions: Vec<Mention>,
    pub candidates: CandidateTracker,
}

#[derive(Debug, Clone, Copy)]
pub struct MentionMatcher<'a> {
    catalog: &'a BrandCatalog,
    canonicalizer: &'a Canonicalizer,
}

impl<'a> MentionMatcher<'a> {
    pub fn new(catalog: &'a BrandCatalog, canonicalizer: &'a Canonicalizer) -> Self {
        Self {
            catalog,
            canonicalizer,
        }
    }

    /// Pass 1 over one document
    pub fn scan(&self, doc: &Document) -> DocScan {
        if doc.is_blank() {
            return DocScan::default();
        }

        let text = normalize_for_matching(&doc.text);
        let mut explicit = Vec::new();
        let mut brands = BrandCounter::new();

        for caps in self.catalog.explicit_pattern().captures_iter(&text) {
            let (Some(whole), Some(brand), Some(model)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            brands.add(&normalize_brand(brand.as_str()));
            explicit.push((
                whole.range(),
                MentionCandidate {
                    brand: brand.as_str().to_string(),
                    model: model.as_str().to_string(),
                    found_text: whole.as_str().to_string(),
                    method: MentionMethod::BrandToken,
                },
            ));
        }

        DocScan {
            text,
            explicit,
            brands,
        }
    }

    /// Pass 1 results turned into mentions, then pass 2. Thread context must
    /// be complete before this runs.
    pub fn resolve(
        &self,
        doc: &Document,
        scan: &DocScan,
        context: &ThreadBrandContext,
    ) -> DocMentions {
        let mut out = DocMentions::default();
        if doc.is_blank() {
            return out;
        }

        for (_, candidate) in &scan.explicit {
            if let Some(mention) = self.explicit_mention(doc, candidate) {
                out.mentions.push(mention);
            }
        }

        let mut has_context: Option<bool> = None;
        for m in self.catalog.standalone_pattern().find_iter(&scan.text) {
            let token = normalize_display(m.as_str().trim()).to_uppercase();
            if !self.catalog.looks_like_model(&token) {
                continue;
            }
            out.candidates.observe(&token, &doc.text);

            // Already counted by pass 1 as part of an explicit pair
            let span = m.range();
            if scan
                .explicit
                .iter()
                .any(|(r, _)| r.start < span.end && span.start < r.end)
            {
                continue;
            }

            if let Some(record) = self.canonicalizer.alias_for(&token) {
                let brand = record
                    .display_name
                    .split_once(' ')
                    .map(|(first, _)| normalize_brand(first))
                    .unwrap_or_default();
                let candidate = MentionCandidate {
                    brand,
                    model: token.clone(),
                    found_text: token.clone(),
                    method: MentionMethod::AliasToken,
                };
                let identity = Identity {
                    key: record.canonical_key.clone(),
                    display: record.display_name.clone(),
                };
                out.mentions.push(build_mention(doc, &candidate, identity));
                continue;
            }

            let gate = *has_context.get_or_insert_with(|| self.catalog.has_speaker_context(&doc.text));
            if !gate {
                continue;
            }

            let Some(brand) = context.infer(doc.thread_id(), &scan.brands, self.catalog) else {
                debug!(
                    target: TARGET_ENTITY,
                    "No brand to infer for '{}' in {}", token, doc.provenance.doc_id
                );
                continue;
            };

            let identity = self.canonicalizer.normalize(&format!("{} {}", brand, token));
            if identity.key.is_empty() {
                continue;
            }
            let candidate = MentionCandidate {
                brand: output_brand(&identity.display, &brand),
                model: token.clone(),
                found_text: token,
                method: MentionMethod::InferredBrand,
            };
            out.mentions.push(build_mention(doc, &candidate, identity));
        }

        out
    }

    fn explicit_mention(&self, doc: &Document, candidate: &MentionCandidate) -> Option<Mention> {
        let model = normalize_display(&candidate.model).to_uppercase();
        let brand = normalize_brand(&candidate.brand);
        let identity = self
            .canonicalizer
            .normalize(format!("{} {}", brand, model).trim());
        if identity.key.is_empty() {
            return None;
        }

        let resolved = MentionCandidate {
            brand: output_brand(&identity.display, &brand),
            model,
            found_text: candidate.found_text.clone(),
            method: MentionMethod::BrandToken,
        };
        Some(build_mention(doc, &resolved, identity))
    }
}

/// First word of a multi-word display, otherwise the brand we matched or inferred
fn output_brand(display: &str, fallback: &str) -> String {
    match display.split_once(' ') {
        Some((first, _)) => normalize_brand(first),
        None => fallback.to_string(),
    }
}

fn build_mention(doc: &Document, candidate: &MentionCandidate, identity: Identity) -> Mention {
    Mention {
        canonical_key: identity.key,
        canonical_model: identity.display,
        brand: candidate.brand.clone(),
        model_token: candidate.model.clone(),
        found_text: candidate.found_text.clone(),
        method: candidate.method,
        confidence: candidate.confidence(),
        provenance: doc.provenance.clone(),
    }
}
