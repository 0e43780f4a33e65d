//! Alias reference table
//!
//! The table maps the canonical key of an alias spelling to the identity
//! it should resolve to. It is loaded once per run from a curated CSV and
//! is read-only afterwards.
//!
//! ## Accepted columns (header names are case-insensitive)
//! - `alias` (required)
//! - `canonical`, `canonical_model` or `canonical_name` (optional, first non-empty wins)
//! - `display_name` (optional)
//! - `canonical_key` (optional override)
//!
//! A missing or malformed file is not fatal: the run continues with an
//! empty table and the outcome is reported as [`AliasLoad`].

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument, warn};

use super::normalizer::{canonical_key, normalize_display};
use super::TARGET_ENTITY;

const CANONICAL_COLUMNS: &[&str] = &["canonical", "canonical_model", "canonical_name"];

/// Identity an alias resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRecord {
    pub canonical_key: String,
    pub display_name: String,
}

/// How loading the reference table went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasLoad {
    Loaded(usize),
    Missing,
    Malformed(String),
}

impl AliasLoad {
    pub fn is_available(&self) -> bool {
        matches!(self, AliasLoad::Loaded(_))
    }
}

impl fmt::Display for AliasLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasLoad::Loaded(n) => write!(f, "loaded {} aliases", n),
            AliasLoad::Missing => write!(f, "alias table not found"),
            AliasLoad::Malformed(reason) => write!(f, "alias table malformed: {}", reason),
        }
    }
}

/// Column positions, resolved from the header once
#[derive(Debug)]
struct AliasSchema {
    alias: usize,
    canonical: Vec<usize>,
    display_name: Option<usize>,
    canonical_key: Option<usize>,
}

impl AliasSchema {
    fn resolve(headers: &StringRecord) -> Option<Self> {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| lowered.iter().position(|h| h == name);

        Some(Self {
            alias: find("alias")?,
            canonical: CANONICAL_COLUMNS.iter().filter_map(|c| find(c)).collect(),
            display_name: find("display_name"),
            canonical_key: find("canonical_key"),
        })
    }

    fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> &'r str {
        idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
    }

    fn canonical<'r>(&self, record: &'r StringRecord) -> &'r str {
        self.canonical
            .iter()
            .map(|&i| Self::field(record, Some(i)))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, AliasRecord>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a CSV file, falling back to an empty table
    #[instrument(level = "debug", skip_all)]
    pub fn load<P: AsRef<Path>>(path: P) -> (Self, AliasLoad) {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                target: TARGET_ENTITY,
                "Alias table {} not found, continuing without aliasing",
                path.display()
            );
            return (Self::new(), AliasLoad::Missing);
        }

        match std::fs::File::open(path) {
            Ok(file) => Self::from_reader(file),
            Err(e) => {
                warn!(
                    target: TARGET_ENTITY,
                    "Failed to open alias table {}: {}", path.display(), e
                );
                (Self::new(), AliasLoad::Malformed(e.to_string()))
            }
        }
    }

    /// Parse CSV from any reader; any structural problem yields an empty table
    pub fn from_reader<R: Read>(reader: R) -> (Self, AliasLoad) {
        match Self::parse(reader) {
            Ok(table) => {
                info!(
                    target: TARGET_ENTITY,
                    "Loaded {} aliases", table.len()
                );
                let count = table.len();
                (table, AliasLoad::Loaded(count))
            }
            Err(reason) => {
                warn!(
                    target: TARGET_ENTITY,
                    "Alias table unusable, continuing without aliasing: {}", reason
                );
                (Self::new(), AliasLoad::Malformed(reason))
            }
        }
    }

    fn parse<R: Read>(reader: R) -> Result<Self, String> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(reader);

        let headers = rdr.headers().map_err(|e| e.to_string())?.clone();
        let schema = AliasSchema::resolve(&headers)
            .ok_or_else(|| "missing required 'alias' column".to_string())?;

        let mut table = Self::new();
        for result in rdr.records() {
            let record = result.map_err(|e| e.to_string())?;
            let alias = AliasSchema::field(&record, Some(schema.alias));
            if alias.is_empty() || alias.starts_with('#') {
                continue;
            }

            table.insert_with(
                alias,
                schema.canonical(&record),
                AliasSchema::field(&record, schema.display_name),
                AliasSchema::field(&record, schema.canonical_key),
            );
        }

        Ok(table)
    }

    /// Add an alias resolving to `canonical` (a "BRAND MODEL" display string)
    pub fn insert(&mut self, alias: &str, canonical: &str) -> bool {
        self.insert_with(alias, canonical, "", "")
    }

    /// Add an alias with every optional column spelled out. Returns false
    /// when the alias has no usable key.
    pub fn insert_with(
        &mut self,
        alias: &str,
        canonical: &str,
        display_name: &str,
        key_override: &str,
    ) -> bool {
        let alias_key = canonical_key(alias);
        if alias_key.is_empty() {
            return false;
        }

        let display_name = if !display_name.is_empty() {
            normalize_display(display_name)
        } else if !canonical.is_empty() {
            normalize_display(canonical)
        } else {
            normalize_display(alias)
        };

        let mut key = if !key_override.is_empty() {
            canonical_key(key_override)
        } else {
            canonical_key(&display_name)
        };
        if key.is_empty() {
            key = alias_key.clone();
        }

        self.entries.insert(
            alias_key,
            AliasRecord {
                canonical_key: key,
                display_name,
            },
        );
        true
    }

    /// Look up by an already computed canonical key
    pub fn get(&self, key: &str) -> Option<&AliasRecord> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
