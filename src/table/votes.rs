//! Per-identity vote table
//!
//! Carries `thread_ids` alongside the summary columns so several votes
//! tables (one per batch) can be merged at rank time with exact distinct
//! thread counts.

use csv::ReaderBuilder;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

use super::{create_output, open_input, write_table, Columns, TARGET_TABLE};
use crate::entity::normalizer::canonical_key;
use crate::error::Result;
use crate::ranking::aggregate::VoteAggregate;

const TABLE: &str = "votes";
const THREAD_SEPARATOR: &str = "|";
const VARIANT_SEPARATOR: &str = " | ";

pub const VOTE_COLUMNS: &[&str] = &[
    "canonical_key",
    "canonical_model",
    "mentions",
    "unique_threads",
    "vote_score",
    "avg_vote",
    "avg_doc_score",
    "variants",
    "thread_ids",
];

lazy_static! {
    static ref VARIANT_RE: Regex = Regex::new(r"^(.+) \((\d+)\)$").expect("valid variant pattern");
}

#[derive(Debug, Serialize)]
struct VoteRow<'a> {
    canonical_key: &'a str,
    canonical_model: String,
    mentions: usize,
    unique_threads: usize,
    vote_score: f64,
    avg_vote: f64,
    avg_doc_score: f64,
    variants: String,
    thread_ids: String,
}

impl<'a> From<&'a VoteAggregate> for VoteRow<'a> {
    fn from(agg: &'a VoteAggregate) -> Self {
        VoteRow {
            canonical_key: &agg.canonical_key,
            canonical_model: agg.display_name(),
            mentions: agg.mentions,
            unique_threads: agg.unique_threads(),
            vote_score: agg.vote_score,
            avg_vote: agg.avg_vote(),
            avg_doc_score: agg.avg_doc_score(),
            variants: agg.variants_summary(),
            thread_ids: agg
                .thread_ids
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(THREAD_SEPARATOR),
        }
    }
}

pub fn write_votes(path: &Path, aggregates: &[VoteAggregate]) -> Result<()> {
    votes_to_writer(create_output(path)?, aggregates)?;
    info!(
        target: TARGET_TABLE,
        "Wrote {} vote rows to {}",
        aggregates.len(),
        path.display()
    );
    Ok(())
}

pub fn votes_to_writer<W: Write>(writer: W, aggregates: &[VoteAggregate]) -> Result<()> {
    let rows: Vec<VoteRow> = aggregates.iter().map(VoteRow::from).collect();
    write_table(writer, VOTE_COLUMNS, &rows)
}

pub fn read_votes(path: &Path) -> Result<Vec<VoteAggregate>> {
    let aggregates = votes_from_reader(open_input(path)?)?;
    info!(
        target: TARGET_TABLE,
        "Read {} vote rows from {}",
        aggregates.len(),
        path.display()
    );
    Ok(aggregates)
}

/// Rebuild partial aggregates from a votes table. The variants column only
/// lists the most common spellings; mentions it does not account for are
/// credited to `canonical_model`.
pub fn votes_from_reader<R: Read>(reader: R) -> Result<Vec<VoteAggregate>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::new(TABLE, rdr.headers()?);

    let model = Some(columns.require("canonical_model")?);
    let mentions_col = Some(columns.require("mentions")?);
    let vote_score_col = Some(columns.require("vote_score")?);
    let thread_ids_col = Some(columns.require("thread_ids")?);
    let key = columns.find("canonical_key");
    let avg_doc_score = columns.find("avg_doc_score");
    let variants_col = columns.find("variants");
    let unique_threads = columns.find("unique_threads");

    let mut aggregates = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let get = |idx| Columns::field(&record, idx);

        let display = get(model);
        let canonical_key = match get(key) {
            "" => canonical_key(display),
            k => k.to_string(),
        };
        if canonical_key.is_empty() {
            continue;
        }

        let mentions: usize = get(mentions_col)
            .parse()
            .map_err(|_| columns.invalid("mentions", get(mentions_col)))?;
        let vote_score: f64 = get(vote_score_col)
            .parse()
            .map_err(|_| columns.invalid("vote_score", get(vote_score_col)))?;
        let avg_doc: f64 = get(avg_doc_score).parse().unwrap_or(0.0);

        let thread_ids: BTreeSet<String> = get(thread_ids_col)
            .split(THREAD_SEPARATOR)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if let Ok(claimed) = get(unique_threads).parse::<usize>() {
            if claimed != thread_ids.len() {
                warn!(
                    target: TARGET_TABLE,
                    "{}: unique_threads says {} but {} thread ids listed",
                    canonical_key,
                    claimed,
                    thread_ids.len()
                );
            }
        }

        let mut variants = parse_variants(get(variants_col));
        let listed: usize = variants.values().sum();
        if mentions > listed && !display.is_empty() {
            *variants.entry(display.to_string()).or_insert(0) += mentions - listed;
        }

        aggregates.push(VoteAggregate {
            canonical_key,
            variants,
            thread_ids,
            mentions,
            vote_score,
            doc_score_sum: avg_doc * mentions as f64,
        });
    }
    Ok(aggregates)
}

fn parse_variants(raw: &str) -> BTreeMap<String, usize> {
    let mut variants = BTreeMap::new();
    for item in raw.split(VARIANT_SEPARATOR) {
        if let Some(caps) = VARIANT_RE.captures(item.trim()) {
            if let Ok(count) = caps[2].parse::<usize>() {
                *variants.entry(caps[1].to_string()).or_insert(0) += count;
            }
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TallyError;

    fn sample() -> VoteAggregate {
        VoteAggregate {
            canonical_key: "kefq150".to_string(),
            variants: [("KEF Q150".to_string(), 3), ("kef q150".to_string(), 1)]
                .into_iter()
                .collect(),
            thread_ids: ["a", "b"].iter().map(|t| t.to_string()).collect(),
            mentions: 4,
            vote_score: 6.5,
            doc_score_sum: 10.0,
        }
    }

    #[test]
    fn test_written_table_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("votes.csv");
        write_votes(&path, &[sample()]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("KEF Q150 (3) | kef q150 (1)"));
        assert!(text.contains(",a|b"));

        let back = read_votes(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].variants, sample().variants);
        assert_eq!(back[0].thread_ids, sample().thread_ids);
        assert_eq!(back[0].mentions, 4);
        assert!((back[0].avg_doc_score() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_unlisted_mentions_go_to_display() {
        let csv = "canonical_model,mentions,vote_score,thread_ids,variants\n\
                   KEF Q150,5,5.0,a|b,KEF Q-150 (2)\n";
        let back = votes_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(back[0].canonical_key, "kefq150");
        assert_eq!(back[0].variants.get("KEF Q-150"), Some(&2));
        assert_eq!(back[0].variants.get("KEF Q150"), Some(&3));
        assert_eq!(back[0].unique_threads(), 2);
    }

    #[test]
    fn test_requires_thread_ids() {
        let csv = "canonical_model,mentions,vote_score\nKEF Q150,1,1.0\n";
        match votes_from_reader(csv.as_bytes()) {
            Err(TallyError::MissingColumn { column, .. }) => assert_eq!(column, "thread_ids"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_mentions_value() {
        let csv = "canonical_model,mentions,vote_score,thread_ids\nKEF Q150,many,1.0,a\n";
        assert!(matches!(
            votes_from_reader(csv.as_bytes()),
            Err(TallyError::InvalidValue { .. })
        ));
    }
}
