//! Choosing one display name for a group of spellings

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::entity::normalizer::collapse_whitespace;

/// How many spellings the variants column lists
pub const MAX_VARIANTS: usize = 6;

lazy_static! {
    static ref TRAILING_PUNCT_RE: Regex = Regex::new(r"[\s.,;:!?]+$").expect("valid pattern");
}

/// Whitespace collapsed, uppercased, trailing punctuation dropped
pub fn clean_display(raw: &str) -> String {
    let s = collapse_whitespace(raw).to_uppercase();
    TRAILING_PUNCT_RE.replace(&s, "").into_owned()
}

fn hyphen_in_last_token(s: &str) -> bool {
    s.rsplit(' ').next().map_or(false, |last| last.contains('-'))
}

fn punctuation_count(s: &str) -> usize {
    s.chars().filter(|c| !c.is_alphanumeric() && *c != ' ').count()
}

/// Order for equally frequent spellings, best first
fn tie_order(a: &str, b: &str) -> Ordering {
    hyphen_in_last_token(b)
        .cmp(&hyphen_in_last_token(a))
        .then_with(|| punctuation_count(a).cmp(&punctuation_count(b)))
        .then_with(|| a.chars().count().cmp(&b.chars().count()))
        .then_with(|| a.cmp(b))
}

/// Most frequent cleaned spelling. Ties prefer a hyphenated model token
/// (`RP-600M` over `RP600M`), then less punctuation, then shorter, then
/// lexical order.
pub fn pick_best_display<S, I>(variants: I) -> Option<String>
where
    S: AsRef<str>,
    I: IntoIterator<Item = (S, usize)>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (raw, count) in variants {
        let cleaned = clean_display(raw.as_ref());
        if cleaned.is_empty() {
            continue;
        }
        *counts.entry(cleaned).or_insert(0) += count;
    }

    counts
        .into_iter()
        .min_by(|(a, ca), (b, cb)| cb.cmp(ca).then_with(|| tie_order(a, b)))
        .map(|(display, _)| display)
}

/// `NAME (count) | NAME (count) | ...`, most frequent first
pub fn variants_summary<'a, I>(variants: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a usize)>,
{
    let mut items: Vec<(&String, usize)> = variants.into_iter().map(|(v, c)| (v, *c)).collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    items
        .into_iter()
        .take(MAX_VARIANTS)
        .map(|(v, c)| format!("{} ({})", v, c))
        .collect::<Vec<_>>()
        .join(" | ")
}
