//! Brand inference for standalone model tokens
//!
//! Context is built in two layers from explicit `BRAND model` matches:
//! per document, and summed per thread across the whole batch. A token with
//! no brand of its own borrows the document's most frequent brand, or the
//! thread's if the document has none. Ties go to the brand listed earliest
//! in the catalog.

use dashmap::DashMap;
use std::collections::HashMap;

use super::catalog::BrandCatalog;

/// Brand -> explicit mention count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandCounter {
    counts: HashMap<String, usize>,
}

impl BrandCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, brand: &str) {
        *self.counts.entry(brand.to_string()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &BrandCounter) {
        for (brand, count) in &other.counts {
            *self.counts.entry(brand.clone()).or_insert(0) += count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Most frequent brand; ties by catalog position, then lexically
    pub fn most_common(&self, catalog: &BrandCatalog) -> Option<&str> {
        self.counts
            .iter()
            .max_by(|(a, ca), (b, cb)| {
                ca.cmp(cb)
                    .then_with(|| catalog.rank_of(b).cmp(&catalog.rank_of(a)))
                    .then_with(|| b.cmp(a))
            })
            .map(|(brand, _)| brand.as_str())
    }
}

/// Thread-level brand counts for one extraction run.
///
/// Filled concurrently during the context phase; only read once the
/// resolution phase starts.
#[derive(Debug, Default)]
pub struct ThreadBrandContext {
    threads: DashMap<String, BrandCounter>,
}

impl ThreadBrandContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one document's explicit brand counts into its thread
    pub fn record(&self, thread_id: &str, doc_brands: &BrandCounter) {
        if thread_id.is_empty() || doc_brands.is_empty() {
            return;
        }
        self.threads
            .entry(thread_id.to_string())
            .or_default()
            .merge(doc_brands);
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Document brands first, thread brands second, otherwise nothing
    pub fn infer(
        &self,
        thread_id: &str,
        doc_brands: &BrandCounter,
        catalog: &BrandCatalog,
    ) -> Option<String> {
        if let Some(brand) = doc_brands.most_common(catalog) {
            return Some(brand.to_string());
        }
        let entry = self.threads.get(thread_id)?;
        entry.value().most_common(catalog).map(str::to_string)
    }
}
