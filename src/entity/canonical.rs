use tracing::debug;

use super::aliases::{AliasRecord, AliasTable};
use super::normalizer::{canonical_key, normalize_display};
use super::TARGET_ENTITY;

/// Resolved product identity: grouping key plus display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub key: String,
    pub display: String,
}

/// Turns raw "BRAND model" strings into canonical identities, applying
/// alias overrides
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    aliases: AliasTable,
}

impl Canonicalizer {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Alias entry for a raw spelling, if any
    pub fn alias_for(&self, raw: &str) -> Option<&AliasRecord> {
        let key = canonical_key(raw);
        if key.is_empty() {
            return None;
        }
        self.aliases.get(&key)
    }

    pub fn has_alias(&self, raw: &str) -> bool {
        self.alias_for(raw).is_some()
    }

    /// Display via [`normalize_display`], key via [`canonical_key`], then the
    /// alias table gets the last word. An empty key means "no identity".
    pub fn normalize(&self, raw: &str) -> Identity {
        let display = normalize_display(raw);
        let key = canonical_key(&display);
        if key.is_empty() {
            return Identity { key, display };
        }

        match self.aliases.get(&key) {
            Some(record) => {
                debug!(
                    target: TARGET_ENTITY,
                    "Normalized '{}' to '{}' using aliases", raw, record.display_name
                );
                Identity {
                    key: record.canonical_key.clone(),
                    display: record.display_name.clone(),
                }
            }
            None => Identity { key, display },
        }
    }
}
