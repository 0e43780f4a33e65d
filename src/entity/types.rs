use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of source document: a thread's opening post or a reply in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Post,
    #[default]
    Comment,
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKind::Post => write!(f, "post"),
            DocKind::Comment => write!(f, "comment"),
        }
    }
}

impl From<&str> for DocKind {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "post" => DocKind::Post,
            _ => DocKind::Comment,
        }
    }
}

/// How a mention's brand was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionMethod {
    /// Explicit "BRAND model" in the text
    BrandToken,
    /// Standalone model token found in the alias table
    AliasToken,
    /// Standalone model token paired with a brand guessed from context
    InferredBrand,
}

impl MentionMethod {
    pub const fn confidence(self) -> f64 {
        match self {
            MentionMethod::BrandToken => 1.0,
            MentionMethod::AliasToken => 0.95,
            MentionMethod::InferredBrand => 0.65,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MentionMethod::BrandToken => "brand_token",
            MentionMethod::AliasToken => "alias_token",
            MentionMethod::InferredBrand => "inferred_brand",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "brand_token" => Some(MentionMethod::BrandToken),
            "alias_token" => Some(MentionMethod::AliasToken),
            "inferred_brand" => Some(MentionMethod::InferredBrand),
            _ => None,
        }
    }
}

impl fmt::Display for MentionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a document came from. Copied through to every mention unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub doc_kind: DocKind,
    pub doc_id: String,
    pub thread_id: String,
    pub subreddit: String,
    pub score: i64,
    pub created_utc: String,
    pub source_file: String,
    pub run_id: String,
}

/// One post or comment handed to the engine by the ingestion stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub text: String,
    pub provenance: Provenance,
}

impl Document {
    pub fn new(text: &str, kind: DocKind, doc_id: &str, thread_id: &str, score: i64) -> Self {
        Document {
            text: text.to_string(),
            provenance: Provenance {
                doc_kind: kind,
                doc_id: doc_id.to_string(),
                thread_id: thread_id.to_string(),
                score,
                ..Default::default()
            },
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.provenance.thread_id
    }

    /// Documents with no usable text are skipped silently
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A raw match before canonicalization
#[derive(Debug, Clone, PartialEq)]
pub struct MentionCandidate {
    pub brand: String,
    pub model: String,
    pub found_text: String,
    pub method: MentionMethod,
}

impl MentionCandidate {
    pub fn confidence(&self) -> f64 {
        self.method.confidence()
    }
}

/// One resolved product reference in one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub canonical_key: String,
    pub canonical_model: String,
    pub brand: String,
    pub model_token: String,
    pub found_text: String,
    pub method: MentionMethod,
    pub confidence: f64,
    #[serde(flatten)]
    pub provenance: Provenance,
}

/// Unresolved standalone token kept for alias curation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateToken {
    pub token: String,
    pub count: usize,
    pub examples: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(MentionMethod::BrandToken.confidence(), 1.0);
        assert_eq!(MentionMethod::AliasToken.confidence(), 0.95);
        assert_eq!(MentionMethod::InferredBrand.confidence(), 0.65);
    }

    #[test]
    fn test_method_names() {
        for method in [
            MentionMethod::BrandToken,
            MentionMethod::AliasToken,
            MentionMethod::InferredBrand,
        ] {
            assert_eq!(MentionMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(MentionMethod::parse("guess"), None);
    }

    #[test]
    fn test_doc_kind_parsing() {
        assert_eq!(DocKind::from("post"), DocKind::Post);
        assert_eq!(DocKind::from(" POST "), DocKind::Post);
        assert_eq!(DocKind::from("comment"), DocKind::Comment);
        // Unknown kinds count as replies
        assert_eq!(DocKind::from(""), DocKind::Comment);
    }

    #[test]
    fn test_blank_documents() {
        assert!(Document::new("  \n\t", DocKind::Post, "t3_a", "a", 0).is_blank());
        assert!(!Document::new("KEF Q150", DocKind::Post, "t3_a", "a", 0).is_blank());
    }
}
