//! Text normalization for matching, display and keying
//!
//! Three tracks, each deterministic:
//! - [`normalize_for_matching`] prepares whole documents for the pattern scan
//! - [`normalize_display`] cleans a single product string for output
//! - [`canonical_key`] folds a product string into a lossy grouping key
//!
//! Display cleanup fuses a lone series letter onto its digits ("Q 150" ->
//! "Q150") unless the letter follows `&`, so "B&W 606" keeps its space.
//! Keys drop spacing anyway and are not affected.
//!
//! None of these fail. Empty input yields an empty string, which callers
//! treat as "no match".

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Unicode hyphen/dash variants that people paste in from phones and word processors
    static ref DASH_RE: Regex =
        Regex::new(r"[\u{2010}\u{2011}\u{2012}\u{2013}\u{2014}\u{2212}\u{FE58}\u{FE63}\u{FF0D}]")
            .expect("valid dash pattern");
    static ref DASH_SPACING_RE: Regex = Regex::new(r"\s*-\s*").expect("valid dash spacing pattern");
    static ref TRAILING_PUNCT_RE: Regex =
        Regex::new(r#"[\s.,;:!?)\]}>"'\u{2019}\u{201D}]+$"#).expect("valid trailing pattern");
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");

    // "Q-150" / "Q 150" -> "Q150"; digits-only suffix. The letter must start
    // a word and must not be the W of "B&W".
    static ref LETTER_DASH_DIGITS_RE: Regex =
        Regex::new(r"(^|[^\w&])([A-Za-z])\s*-\s*(\d{2,4})\b").expect("valid letter-dash pattern");
    static ref LETTER_SPACE_DIGITS_RE: Regex =
        Regex::new(r"(^|[^\w&])([A-Za-z])\s+(\d{2,4})\b").expect("valid letter-space pattern");

    static ref BW_PHRASE_RE: Regex =
        Regex::new(r"(?i)\b(bowers\s*(?:&|and)?\s*wilkins|bowers\s+wilkins)\b")
            .expect("valid B&W phrase pattern");
    static ref BW_ABBREV_RE: Regex =
        Regex::new(r"(?i)\b(b\s*&\s*w|b\s+and\s+w|bw)\b").expect("valid B&W abbreviation pattern");

    // Multi-word brands whose spacing varies in the wild
    static ref BRAND_PHRASES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\bq\s*acoustics\b").expect("valid phrase"), "Q Acoustics"),
        (Regex::new(r"(?i)\bmonitor\s+audio\b").expect("valid phrase"), "Monitor Audio"),
    ];
}

fn nfkc(s: &str) -> String {
    s.nfkc().collect::<String>()
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s.trim(), " ").into_owned()
}

/// Prepare raw document text for the pattern scan.
///
/// NFKC, ASCII hyphens, and multi-word brand phrases collapsed to the token
/// the brand alternation knows (`Bowers & Wilkins` -> `B&W`). Idempotent.
pub fn normalize_for_matching(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let s = nfkc(text);
    let s = DASH_RE.replace_all(&s, "-");
    let mut s = BW_PHRASE_RE.replace_all(&s, "B&W").into_owned();
    for (pattern, replacement) in BRAND_PHRASES.iter() {
        s = pattern.replace_all(&s, *replacement).into_owned();
    }
    s
}

/// Clean a product string for display: `" KEF  Q - 150. "` -> `"KEF Q150"`
pub fn normalize_display(raw: &str) -> String {
    let s = nfkc(raw);
    let s = s.trim();

    let s = DASH_RE.replace_all(s, "-");
    let s = DASH_SPACING_RE.replace_all(&s, "-");
    let s = TRAILING_PUNCT_RE.replace(&s, "");
    let s = collapse_whitespace(&s);

    let s = LETTER_DASH_DIGITS_RE.replace_all(&s, "${1}${2}${3}");
    let s = LETTER_SPACE_DIGITS_RE.replace_all(&s, "${1}${2}${3}");

    s.into_owned()
}

/// Lowercase alphanumeric grouping key. Lossy on purpose: punctuation and
/// spacing differences collapse to the same identity.
pub fn canonical_key(raw: &str) -> String {
    // Fold before and after display cleanup: the series-letter rule would
    // otherwise glue "B and W 606" into "B and W606" and hide the abbreviation.
    let s = normalize_display(&fold_bw(&nfkc(raw)));
    let s = fold_bw(&s);

    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

fn fold_bw(s: &str) -> String {
    let s = BW_PHRASE_RE.replace_all(s, "bw");
    BW_ABBREV_RE.replace_all(&s, "bw").into_owned()
}

/// Normalize a captured brand spelling to its reporting form
pub fn normalize_brand(brand: &str) -> String {
    let b = collapse_whitespace(brand).to_uppercase();
    let b = b.replace("QACOUSTICS", "Q ACOUSTICS");
    match b.as_str() {
        "BW" | "BOWERS" | "WILKINS" => "B&W".to_string(),
        _ => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_normalization() {
        assert_eq!(normalize_display("KEF Q150"), "KEF Q150");
        assert_eq!(normalize_display("  KEF   Q150.  "), "KEF Q150");
        assert_eq!(normalize_display("KEF Q-150"), "KEF Q150");
        assert_eq!(normalize_display("KEF Q 150"), "KEF Q150");
        assert_eq!(normalize_display("KEF Q \u{2013} 150"), "KEF Q150");
        assert_eq!(normalize_display("Klipsch RP - 600M!"), "Klipsch RP-600M");
        assert_eq!(normalize_display("ELAC DBR62)"), "ELAC DBR62");
        assert_eq!(normalize_display("B&W 606"), "B&W 606");
        assert_eq!(normalize_display("Q 150 and R 51"), "Q150 and R51");
        // Longer digit runs stay as written
        assert_eq!(normalize_display("A 12345"), "A 12345");
        assert_eq!(normalize_display(""), "");
    }

    #[test]
    fn test_fullwidth_input() {
        // NFKC folds fullwidth forms before any other rule runs
        assert_eq!(normalize_display("ＫＥＦ Ｑ１５０"), "KEF Q150");
    }

    #[test]
    fn test_key_stability() {
        let a = canonical_key("Q-150");
        assert_eq!(a, "q150");
        assert_eq!(canonical_key("Q 150"), a);
        assert_eq!(canonical_key("Q150"), a);
        assert_eq!(canonical_key("q\u{2010}150."), a);
    }

    #[test]
    fn test_brand_folding() {
        let expected = canonical_key("bw606");
        assert_eq!(expected, "bw606");
        assert_eq!(canonical_key("Bowers & Wilkins 606"), expected);
        assert_eq!(canonical_key("Bowers and Wilkins 606"), expected);
        assert_eq!(canonical_key("B&W 606"), expected);
        assert_eq!(canonical_key("B & W 606"), expected);
        assert_eq!(canonical_key("B and W 606"), expected);
    }

    #[test]
    fn test_key_strips_everything_but_alnum() {
        assert_eq!(canonical_key("Klipsch RP-600M"), "klipschrp600m");
        assert_eq!(canonical_key("ELAC B6.2"), "elacb62");
        assert_eq!(canonical_key("!!!"), "");
        assert_eq!(canonical_key(""), "");
    }

    #[test]
    fn test_matching_text_preparation() {
        assert_eq!(
            normalize_for_matching("my Bowers & Wilkins 606 sound great"),
            "my B&W 606 sound great"
        );
        assert_eq!(
            normalize_for_matching("Bowers and Wilkins 607"),
            "B&W 607"
        );
        assert_eq!(normalize_for_matching("BowersWilkins 705"), "B&W 705");
        assert_eq!(normalize_for_matching("R\u{2011}51M"), "R-51M");
        assert_eq!(normalize_for_matching("QAcoustics 3020i"), "Q Acoustics 3020i");
        assert_eq!(normalize_for_matching(""), "");
    }

    #[test]
    fn test_matching_text_idempotent() {
        for text in [
            "Bowers & Wilkins 606 vs q  acoustics 3030i",
            "monitor   audio bronze 100 \u{2014} nice",
            "nothing to see",
        ] {
            let once = normalize_for_matching(text);
            assert_eq!(normalize_for_matching(&once), once);
        }
    }

    #[test]
    fn test_brand_normalization() {
        assert_eq!(normalize_brand("kef"), "KEF");
        assert_eq!(normalize_brand("bw"), "B&W");
        assert_eq!(normalize_brand("Bowers"), "B&W");
        assert_eq!(normalize_brand("QAcoustics"), "Q ACOUSTICS");
        assert_eq!(normalize_brand("monitor   audio"), "MONITOR AUDIO");
    }

    proptest! {
        #[test]
        fn prop_display_idempotent(s in "[A-Za-z0-9 .,&\\-]{0,24}") {
            let once = normalize_display(&s);
            prop_assert_eq!(normalize_display(&once), once);
        }

        #[test]
        fn prop_key_is_lowercase_alnum(s in "[A-Za-z0-9 .,&\\-]{0,24}") {
            let key = canonical_key(&s);
            prop_assert!(key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }

        #[test]
        fn prop_series_letter_spacing_irrelevant(letter in "[A-Z]", digits in "[0-9]{2,4}") {
            let fused = canonical_key(&format!("{}{}", letter, digits));
            prop_assert_eq!(canonical_key(&format!("{}-{}", letter, digits)), fused.clone());
            prop_assert_eq!(canonical_key(&format!("{} {}", letter, digits)), fused);
        }
    }
}
