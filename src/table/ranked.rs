use std::io::Write;
use std::path::Path;
use tracing::info;

use super::{create_output, write_table, TARGET_TABLE};
use crate::error::Result;
use crate::ranking::rank::RankedEntity;

pub const RANKED_COLUMNS: &[&str] = &[
    "rank",
    "canonical_model",
    "canonical_key",
    "score",
    "vote_score",
    "unique_threads",
    "mentions",
    "avg_vote",
    "avg_doc_score",
];

pub fn write_ranked(path: &Path, ranked: &[RankedEntity]) -> Result<()> {
    ranked_to_writer(create_output(path)?, ranked)?;
    info!(
        target: TARGET_TABLE,
        "Wrote {} ranked rows to {}",
        ranked.len(),
        path.display()
    );
    Ok(())
}

pub fn ranked_to_writer<W: Write>(writer: W, ranked: &[RankedEntity]) -> Result<()> {
    write_table(writer, RANKED_COLUMNS, ranked)
}

pub fn write_ranked_json(path: &Path, ranked: &[RankedEntity]) -> Result<()> {
    let file = create_output(path)?;
    serde_json::to_writer_pretty(file, ranked)?;
    info!(
        target: TARGET_TABLE,
        "Wrote {} ranked rows to {}",
        ranked.len(),
        path.display()
    );
    Ok(())
}
