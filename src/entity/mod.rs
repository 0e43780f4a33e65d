pub mod aliases;
pub mod candidates;
pub mod canonical;
pub mod catalog;
pub mod extraction;
pub mod inference;
pub mod matching;
pub mod normalizer;
pub mod types;

pub use types::*;

pub use aliases::{AliasLoad, AliasTable};
pub use canonical::{Canonicalizer, Identity};
pub use catalog::BrandCatalog;
pub use extraction::{extract_mentions, ExtractionOutput};

// Module-level constants
pub const TARGET_ENTITY: &str = "entity";
