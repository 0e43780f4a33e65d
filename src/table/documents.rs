use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::info;

use super::{open_input, parse_score, Columns, TARGET_TABLE};
use crate::entity::types::{DocKind, Document, Provenance};
use crate::error::Result;

const TABLE: &str = "documents";

/// Read the flattened posts/comments table. `text` and `thread_id` are
/// required; every other column is optional.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let docs = documents_from_reader(open_input(path)?)?;
    info!(
        target: TARGET_TABLE,
        "Read {} documents from {}",
        docs.len(),
        path.display()
    );
    Ok(docs)
}

pub fn documents_from_reader<R: Read>(reader: R) -> Result<Vec<Document>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::new(TABLE, rdr.headers()?);

    let text = columns.require("text")?;
    let thread_id = columns.require("thread_id")?;
    let doc_kind = columns.find("doc_kind");
    let doc_id = columns.find("doc_id");
    let subreddit = columns.find("subreddit");
    let score = columns.find("score");
    let created_utc = columns.find("created_utc");
    let source_file = columns.find("source_file");
    let run_id = columns.find("run_id");

    let mut docs = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let field = |idx| Columns::field(&record, idx).to_string();
        docs.push(Document {
            // Text is kept verbatim; only provenance fields are trimmed
            text: record.get(text).unwrap_or("").to_string(),
            provenance: Provenance {
                doc_kind: DocKind::from(Columns::field(&record, doc_kind)),
                doc_id: field(doc_id),
                thread_id: field(Some(thread_id)),
                subreddit: field(subreddit),
                score: parse_score(Columns::field(&record, score)),
                created_utc: field(created_utc),
                source_file: field(source_file),
                run_id: field(run_id),
            },
        });
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TallyError;

    #[test]
    fn test_reads_documents() {
        let csv = "doc_kind,doc_id,thread_id,subreddit,score,text\n\
                   post,t3_a,a,audiophile,12,KEF Q150 vs Klipsch R-51M\n\
                   comment,t1_b,a,audiophile,n/a,the RP-600M?\n\
                   ,t1_c,a,audiophile,3.0,\n";
        let docs = documents_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].provenance.doc_kind, DocKind::Post);
        assert_eq!(docs[0].provenance.score, 12);
        assert_eq!(docs[1].provenance.score, 0);
        assert_eq!(docs[2].provenance.doc_kind, DocKind::Comment);
        assert_eq!(docs[2].provenance.score, 3);
        assert!(docs[2].is_blank());
        assert_eq!(docs[0].provenance.subreddit, "audiophile");
    }

    #[test]
    fn test_minimal_columns() {
        let csv = "TEXT,Thread_ID\nhello,t\n";
        let docs = documents_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(docs[0].thread_id(), "t");
        assert_eq!(docs[0].provenance.score, 0);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "doc_id,text\n1,KEF Q150\n";
        match documents_from_reader(csv.as_bytes()) {
            Err(TallyError::MissingColumn { column, .. }) => assert_eq!(column, "thread_id"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_documents(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, TallyError::InputNotFound(_)));
    }
}
