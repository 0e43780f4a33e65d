//! CSV adapters for the pipeline's tables
//!
//! Readers resolve header names case-insensitively and fail with
//! [`TallyError::MissingColumn`] when a required column is absent. Writers
//! always emit a header row, so an empty result is still a valid table.

pub mod candidates;
pub mod documents;
pub mod mentions;
pub mod ranked;
pub mod votes;

use csv::{StringRecord, Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Result, TallyError};

pub use candidates::{read_candidates, write_candidates};
pub use documents::read_documents;
pub use mentions::{read_mentions, write_mentions};
pub use ranked::{write_ranked, write_ranked_json};
pub use votes::{read_votes, write_votes};

// Module-level constants
pub const TARGET_TABLE: &str = "table";

/// Header positions of one table, by lowercased name
#[derive(Debug)]
pub(crate) struct Columns {
    table: &'static str,
    names: Vec<String>,
}

impl Columns {
    pub(crate) fn new(table: &'static str, headers: &StringRecord) -> Self {
        Self {
            table,
            names: headers.iter().map(|h| h.trim().to_lowercase()).collect(),
        }
    }

    pub(crate) fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|h| h == name)
    }

    pub(crate) fn require(&self, name: &str) -> Result<usize> {
        self.find(name)
            .ok_or_else(|| TallyError::missing_column(self.table, name))
    }

    pub(crate) fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> &'r str {
        idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
    }

    pub(crate) fn invalid(&self, column: &str, value: &str) -> TallyError {
        TallyError::InvalidValue {
            table: self.table.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

pub(crate) fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TallyError::InputNotFound(path.to_path_buf()),
        _ => TallyError::Io(e),
    })
}

pub(crate) fn create_output(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

/// Header row first, then one serialized row per item
pub(crate) fn write_table<W, T>(writer: W, columns: &[&str], rows: &[T]) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    let mut wtr: Writer<W> = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(columns)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Document scores arrive as integers, floats or junk; junk counts as 0
pub(crate) fn parse_score(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(score) = raw.parse::<i64>() {
        return score;
    }
    match raw.parse::<f64>() {
        Ok(score) if score.is_finite() => score.round() as i64,
        _ => 0,
    }
}
