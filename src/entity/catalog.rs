//! Brand catalog and the compiled patterns derived from it
//!
//! The catalog is built once at startup and shared read-only between
//! workers. Nothing in here is mutated after [`BrandCatalog::new`] returns.

use lazy_static::lazy_static;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use super::normalizer::normalize_brand;
use super::TARGET_ENTITY;
use crate::error::TallyError;

/// Known brand spellings, in catalog order. Catalog order is also the
/// brand-inference tie-break.
pub const DEFAULT_BRANDS: &[&str] = &[
    "KEF", "ELAC", "POLK", "SVS", "KLIPSCH", "JBL", "SONY", "YAMAHA", "DENON", "MARANTZ",
    "ONKYO", "PIONEER", "WHARFEDALE", "FOCAL", "DALI", "PARADIGM", "EMOTIVA", "FLUANCE", "MICCA",
    "EDIFIER", "MONOPRICE", "B&W", "BW", "BOWERS", "WILKINS", "Q ACOUSTICS", "QACOUSTICS", "JAMO",
    "NEUMI", "RSL", "HSU", "ASCEND", "AR", "AUDIOENGINE", "CAMBRIDGE", "CANTON", "CERWIN", "CHANE",
    "DYNACO", "DYNAUDIO", "GENELEC", "HARBETH", "INFINITY", "MAGNEPAN", "MISSION",
    "MONITOR AUDIO", "NHT", "PSB", "REVEL", "SALK", "SENNHEISER", "TANNOY", "TEAC", "TRIANGLE",
    "VANDERSTEEN", "VIENNA",
];

/// Words that mark a document as talking about speakers. Matched as
/// case-insensitive substrings of the raw text.
pub const DEFAULT_SPEAKER_CONTEXT: &[&str] = &[
    "speaker", "speakers", "bookshelf", "bookself", "monitor", "monitors", "pair", "pairs",
    "stands", "nearfield", "passive", "amp", "receiver", "integrated", "sub", "subwoofer",
    "stereo", "2.0", "2.1",
];

/// Numeric strings that look like model numbers but never are
pub const DEFAULT_JUNK_TOKENS: &[&str] = &[
    "2.0", "2.1", "5.1", "7.1", "3.5", "6.5", "8.0", "10.0", "12.0", "14.0", "1080", "1440", "4K",
    "8K",
];

pub const MIN_TOKEN_LEN: usize = 2;
pub const MAX_TOKEN_LEN: usize = 25;

/// At least one digit inside a run of letters/digits/dots/hyphens, with an
/// optional leading series letter: R-51M, Q150, B6.2, RP-600M
pub const MODEL_TOKEN_PATTERN: &str = r"[A-Z]?[A-Z0-9][A-Z0-9.\-]{1,20}\d[A-Z0-9.\-]{0,20}";

lazy_static! {
    static ref NUMERIC_ONLY_RE: Regex = Regex::new(r"^[\d.\-]+$").expect("valid numeric pattern");
}

#[derive(Debug, Clone)]
pub struct BrandCatalog {
    brands: Vec<String>,
    context_words: Vec<String>,
    junk_tokens: HashSet<String>,
    explicit_re: Regex,
    standalone_re: Regex,
}

// Built-in catalog, compiled on first use
static BUILTIN_CATALOG: Lazy<BrandCatalog> = Lazy::new(|| {
    BrandCatalog::new(DEFAULT_BRANDS, DEFAULT_SPEAKER_CONTEXT, DEFAULT_JUNK_TOKENS)
        .expect("built-in catalog compiles")
});

impl Default for BrandCatalog {
    fn default() -> Self {
        BUILTIN_CATALOG.clone()
    }
}

impl BrandCatalog {
    pub fn new<B, C, J>(brands: &[B], context_words: &[C], junk_tokens: &[J]) -> Result<Self, TallyError>
    where
        B: AsRef<str>,
        C: AsRef<str>,
        J: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let brands: Vec<String> = brands
            .iter()
            .map(|b| b.as_ref().trim().to_uppercase())
            .filter(|b| !b.is_empty() && seen.insert(b.clone()))
            .collect();

        if brands.is_empty() {
            return Err(TallyError::InvalidCatalog("no brand spellings".to_string()));
        }

        let explicit_re = Regex::new(&format!(
            r"(?i)\b({})\s+({})\b",
            brand_alternation(&brands),
            MODEL_TOKEN_PATTERN
        ))
        .map_err(|e| TallyError::InvalidCatalog(e.to_string()))?;
        let standalone_re = Regex::new(&format!(r"(?i)\b({})\b", MODEL_TOKEN_PATTERN))
            .map_err(|e| TallyError::InvalidCatalog(e.to_string()))?;

        debug!(
            target: TARGET_ENTITY,
            "Compiled brand catalog with {} spellings", brands.len()
        );

        Ok(Self {
            brands,
            context_words: context_words
                .iter()
                .map(|w| w.as_ref().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            junk_tokens: junk_tokens.iter().map(|t| t.as_ref().to_uppercase()).collect(),
            explicit_re,
            standalone_re,
        })
    }

    /// Default catalog plus extra brand spellings appended after the built-ins
    pub fn with_extra_brands<S: AsRef<str>>(extra: &[S]) -> Result<Self, TallyError> {
        let mut brands: Vec<String> = DEFAULT_BRANDS.iter().map(|b| b.to_string()).collect();
        brands.extend(extra.iter().map(|b| b.as_ref().to_string()));
        Self::new(&brands, DEFAULT_SPEAKER_CONTEXT, DEFAULT_JUNK_TOKENS)
    }

    /// `BRAND <model>`; group 1 is the brand, group 2 the model token
    pub fn explicit_pattern(&self) -> &Regex {
        &self.explicit_re
    }

    /// A model token on its own; group 1 is the token
    pub fn standalone_pattern(&self) -> &Regex {
        &self.standalone_re
    }

    /// Position of a normalized brand in the catalog, used to break ties.
    /// Brands outside the catalog sort last.
    pub fn rank_of(&self, brand: &str) -> usize {
        self.brands
            .iter()
            .position(|b| normalize_brand(b) == brand)
            .unwrap_or(usize::MAX)
    }

    /// Whether raw document text carries any speaker-context vocabulary
    pub fn has_speaker_context(&self, raw_text: &str) -> bool {
        let lowered = raw_text.to_lowercase();
        self.context_words.iter().any(|w| lowered.contains(w.as_str()))
    }

    /// Reject junk numerics, out-of-range lengths, and digits-and-punctuation-only strings
    pub fn looks_like_model(&self, token: &str) -> bool {
        let t = token.trim().to_uppercase();
        if t.is_empty() || self.junk_tokens.contains(&t) {
            return false;
        }
        let len = t.chars().count();
        if !(MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&len) {
            return false;
        }
        !NUMERIC_ONLY_RE.is_match(&t)
    }
}

/// Longest spelling first so "MONITOR AUDIO" wins over any shorter prefix;
/// equal lengths in lexical order to keep the pattern stable.
fn brand_alternation(brands: &[String]) -> String {
    let mut sorted: Vec<&String> = brands.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    sorted
        .iter()
        .map(|b| {
            b.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_pattern_finds_brand_and_model() {
        let catalog = BrandCatalog::default();
        let caps = catalog
            .explicit_pattern()
            .captures("Picked up a pair of KEF Q150 today")
            .unwrap();
        assert_eq!(&caps[1], "KEF");
        assert_eq!(&caps[2], "Q150");
    }

    #[test]
    fn test_multi_word_brand_preferred() {
        let catalog = BrandCatalog::default();
        let caps = catalog
            .explicit_pattern()
            .captures("the monitor audio bronze 100 is fine, Monitor Audio B100 too")
            .unwrap();
        assert_eq!(&caps[1], "Monitor Audio");
        assert_eq!(&caps[2], "B100");
    }

    #[test]
    fn test_no_sub_token_matches() {
        let catalog = BrandCatalog::default();
        // "SVS" inside a longer word is not a brand
        assert!(catalog.explicit_pattern().captures("XSVS SB1000").is_none());
        // Model token glued to letters on the right is rejected
        assert!(catalog.explicit_pattern().captures("KEF Q150abc_def").is_none());
    }

    #[test]
    fn test_trailing_punctuation_not_captured() {
        let catalog = BrandCatalog::default();
        let caps = catalog.explicit_pattern().captures("I love my ELAC B6.2.").unwrap();
        assert_eq!(&caps[2], "B6.2");
    }

    #[test]
    fn test_token_filters() {
        let catalog = BrandCatalog::default();
        assert!(catalog.looks_like_model("Q150"));
        assert!(catalog.looks_like_model("RP-600M"));
        assert!(!catalog.looks_like_model("5.1"));
        assert!(!catalog.looks_like_model("1080"));
        assert!(!catalog.looks_like_model("4k"));
        assert!(!catalog.looks_like_model("2024"));
        assert!(!catalog.looks_like_model("12-34.5"));
        assert!(!catalog.looks_like_model("A"));
        assert!(!catalog.looks_like_model(&"A1".repeat(13)));
    }

    #[test]
    fn test_speaker_context_gate() {
        let catalog = BrandCatalog::default();
        assert!(catalog.has_speaker_context("anyone tried the RP-600M Bookshelf speakers?"));
        assert!(catalog.has_speaker_context("running a 2.1 setup"));
        assert!(!catalog.has_speaker_context("my car is a 328i"));
    }

    #[test]
    fn test_catalog_rank_and_extras() {
        let catalog = BrandCatalog::with_extra_brands(&["Buchardt"]).unwrap();
        assert_eq!(catalog.rank_of("KEF"), 0);
        assert!(catalog.rank_of("KLIPSCH") < catalog.rank_of("B&W"));
        assert!(catalog.rank_of("BUCHARDT") > catalog.rank_of("VIENNA"));
        assert_eq!(catalog.rank_of("NOT A BRAND"), usize::MAX);

        let caps = catalog.explicit_pattern().captures("Buchardt S400 mk2").unwrap();
        assert_eq!(&caps[1], "Buchardt");
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let empty: [&str; 0] = [];
        assert!(BrandCatalog::new(&empty, DEFAULT_SPEAKER_CONTEXT, DEFAULT_JUNK_TOKENS).is_err());
    }
}
