use csv::ReaderBuilder;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

use super::{create_output, open_input, write_table, Columns, TARGET_TABLE};
use crate::entity::types::CandidateToken;
use crate::error::Result;

const TABLE: &str = "candidates";

pub const CANDIDATE_COLUMNS: &[&str] = &["token", "count", "examples"];
const EXAMPLE_SEPARATOR: &str = " | ";

#[derive(Debug, Serialize)]
struct CandidateRow<'a> {
    token: &'a str,
    count: usize,
    examples: String,
}

pub fn write_candidates(path: &Path, candidates: &[CandidateToken]) -> Result<()> {
    candidates_to_writer(create_output(path)?, candidates)?;
    info!(
        target: TARGET_TABLE,
        "Wrote {} candidate tokens to {}",
        candidates.len(),
        path.display()
    );
    Ok(())
}

pub fn candidates_to_writer<W: Write>(writer: W, candidates: &[CandidateToken]) -> Result<()> {
    let rows: Vec<CandidateRow> = candidates
        .iter()
        .map(|c| CandidateRow {
            token: &c.token,
            count: c.count,
            examples: c.examples.join(EXAMPLE_SEPARATOR),
        })
        .collect();
    write_table(writer, CANDIDATE_COLUMNS, &rows)
}

pub fn read_candidates(path: &Path) -> Result<Vec<CandidateToken>> {
    candidates_from_reader(open_input(path)?)
}

pub fn candidates_from_reader<R: Read>(reader: R) -> Result<Vec<CandidateToken>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::new(TABLE, rdr.headers()?);
    let token = Some(columns.require("token")?);
    let count = Some(columns.require("count")?);
    let examples = columns.find("examples");

    let mut candidates = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let raw_count = Columns::field(&record, count);
        candidates.push(CandidateToken {
            token: Columns::field(&record, token).to_string(),
            count: raw_count
                .parse()
                .map_err(|_| columns.invalid("count", raw_count))?,
            examples: Columns::field(&record, examples)
                .split(EXAMPLE_SEPARATOR)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
        });
    }
    Ok(candidates)
}
