pub mod entity;
pub mod environment;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod ranking;
pub mod table;

pub use entity::{
    AliasLoad, AliasTable, BrandCatalog, Canonicalizer, CandidateToken, DocKind, Document, Mention,
    MentionMethod,
};
pub use environment::PipelineConfig;
pub use error::TallyError;
pub use pipeline::{Pipeline, PipelineOutput, RunSummary};
pub use ranking::RankedEntity;

pub const TARGET_PIPELINE: &str = "pipeline";
