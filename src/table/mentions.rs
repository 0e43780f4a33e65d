use csv::ReaderBuilder;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

use super::{create_output, open_input, parse_score, write_table, Columns, TARGET_TABLE};
use crate::entity::normalizer::canonical_key;
use crate::entity::types::{DocKind, Mention, MentionMethod, Provenance};
use crate::error::Result;

const TABLE: &str = "mentions";

pub const MENTION_COLUMNS: &[&str] = &[
    "canonical_key",
    "canonical_model",
    "brand",
    "model_token",
    "found_text",
    "method",
    "confidence",
    "doc_kind",
    "doc_id",
    "thread_id",
    "subreddit",
    "score",
    "created_utc",
    "source_file",
    "run_id",
];

#[derive(Debug, Serialize)]
struct MentionRow<'a> {
    canonical_key: &'a str,
    canonical_model: &'a str,
    brand: &'a str,
    model_token: &'a str,
    found_text: &'a str,
    method: &'static str,
    confidence: f64,
    doc_kind: DocKind,
    doc_id: &'a str,
    thread_id: &'a str,
    subreddit: &'a str,
    score: i64,
    created_utc: &'a str,
    source_file: &'a str,
    run_id: &'a str,
}

impl<'a> From<&'a Mention> for MentionRow<'a> {
    fn from(m: &'a Mention) -> Self {
        let p = &m.provenance;
        MentionRow {
            canonical_key: &m.canonical_key,
            canonical_model: &m.canonical_model,
            brand: &m.brand,
            model_token: &m.model_token,
            found_text: &m.found_text,
            method: m.method.as_str(),
            confidence: m.confidence,
            doc_kind: p.doc_kind,
            doc_id: &p.doc_id,
            thread_id: &p.thread_id,
            subreddit: &p.subreddit,
            score: p.score,
            created_utc: &p.created_utc,
            source_file: &p.source_file,
            run_id: &p.run_id,
        }
    }
}

pub fn write_mentions(path: &Path, mentions: &[Mention]) -> Result<()> {
    mentions_to_writer(create_output(path)?, mentions)?;
    info!(
        target: TARGET_TABLE,
        "Wrote {} mentions to {}",
        mentions.len(),
        path.display()
    );
    Ok(())
}

pub fn mentions_to_writer<W: Write>(writer: W, mentions: &[Mention]) -> Result<()> {
    let rows: Vec<MentionRow> = mentions.iter().map(MentionRow::from).collect();
    write_table(writer, MENTION_COLUMNS, &rows)
}

pub fn read_mentions(path: &Path) -> Result<Vec<Mention>> {
    let mentions = mentions_from_reader(open_input(path)?)?;
    info!(
        target: TARGET_TABLE,
        "Read {} mentions from {}",
        mentions.len(),
        path.display()
    );
    Ok(mentions)
}

/// `canonical_model` and `thread_id` are required. A missing key is derived
/// from the display name; a missing method counts as an explicit match.
pub fn mentions_from_reader<R: Read>(reader: R) -> Result<Vec<Mention>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::new(TABLE, rdr.headers()?);

    let model = Some(columns.require("canonical_model")?);
    let thread_id = Some(columns.require("thread_id")?);
    let key = columns.find("canonical_key");
    let brand = columns.find("brand");
    let model_token = columns.find("model_token");
    let found_text = columns.find("found_text");
    let method = columns.find("method");
    let confidence = columns.find("confidence");
    let doc_kind = columns.find("doc_kind");
    let doc_id = columns.find("doc_id");
    let subreddit = columns.find("subreddit");
    let score = columns.find("score");
    let created_utc = columns.find("created_utc");
    let source_file = columns.find("source_file");
    let run_id = columns.find("run_id");

    let mut mentions = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let get = |idx| Columns::field(&record, idx);

        let canonical_model = get(model);
        let canonical_key = match get(key) {
            "" => canonical_key(canonical_model),
            k => k.to_string(),
        };
        if canonical_key.is_empty() {
            continue;
        }

        let method = match get(method) {
            "" => MentionMethod::BrandToken,
            raw => MentionMethod::parse(raw).ok_or_else(|| columns.invalid("method", raw))?,
        };
        let confidence = get(confidence)
            .parse::<f64>()
            .unwrap_or_else(|_| method.confidence());

        mentions.push(Mention {
            canonical_key,
            canonical_model: canonical_model.to_string(),
            brand: get(brand).to_string(),
            model_token: get(model_token).to_string(),
            found_text: get(found_text).to_string(),
            method,
            confidence,
            provenance: Provenance {
                doc_kind: DocKind::from(get(doc_kind)),
                doc_id: get(doc_id).to_string(),
                thread_id: get(thread_id).to_string(),
                subreddit: get(subreddit).to_string(),
                score: parse_score(get(score)),
                created_utc: get(created_utc).to_string(),
                source_file: get(source_file).to_string(),
                run_id: get(run_id).to_string(),
            },
        });
    }
    Ok(mentions)
}
