//! Integration tests for seriatim.
//!
//! These tests verify the end-to-end functionality of the text reuse detection pipeline.

use seriatim::compare::{detect_reuse, fetch_text};
use seriatim::db::{load_corpus, CorpusFields};
use seriatim::models::{Document, PairFilter, ReuseParams, ReuseRecord};
use seriatim::output::{write_csv, write_jsonl};
use std::io::Write;

const PASSAGE: &str = "the quiet harbor lights flickered while sailors mended nets";

fn source_text() -> String {
    format!("a bald chef hid a jade cake behind a black lamb, if I am glad {PASSAGE} and each maid had flagged a big lime cab ")
}

fn target_text() -> String {
    format!("our twisty sports put snowy rooks onto worn trysts upon your {PASSAGE} so runny rosy sprouts stunt two poor towns")
}

const UNRELATED: &str = "zebras quickly jumped over lazy brown dogs near the riverbank yesterday evening";

fn create_corpus() -> Vec<Document> {
    vec![
        Document::new("src", source_text()),
        Document::new("tgt", target_text()),
        Document::new("other", UNRELATED),
    ]
}

/// The refined target range, trimmed.
fn refined_target_text(record: &ReuseRecord, documents: &[Document]) -> String {
    let target = documents
        .iter()
        .find(|d| d.id == record.target.id)
        .expect("target in corpus");
    let chars: Vec<char> = target.text.chars().collect();
    let (begin, end) = record.target.refined;
    fetch_text(&chars, begin, end).trim().to_string()
}

#[test]
fn test_end_to_end_detects_shared_passage() {
    let documents = create_corpus();
    let result = detect_reuse(&documents, &ReuseParams::default(), false).unwrap();

    assert_eq!(result.summary.documents, 3);
    assert_eq!(result.summary.target_documents, 1);
    assert_eq!(result.summary.failed_documents, 0);
    assert_eq!(result.records.len(), 1);

    let record = &result.records[0];
    let mut ids = [record.source.id.as_str(), record.target.id.as_str()];
    ids.sort();
    assert_eq!(ids, ["src", "tgt"]);

    // Boundary fragments only pick up the adjoining whitespace on the left
    assert_eq!(record.left_alignment.source.trim(), "");
    assert_eq!(record.left_alignment.target.trim(), "");
    assert_eq!(refined_target_text(record, &documents), PASSAGE);
    assert!(record.target.text.matched.starts_with("the quiet harbor"));
}

#[test]
fn test_all_pairs_reports_both_directions() {
    let documents = create_corpus();
    let params = ReuseParams {
        pair_filter: PairFilter::AllPairs,
        ..Default::default()
    };
    let result = detect_reuse(&documents, &params, false).unwrap();

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.summary.target_documents, 2);
    for record in &result.records {
        assert_ne!(record.source.id, record.target.id);
        assert_eq!(refined_target_text(record, &documents), PASSAGE);
    }
}

#[test]
fn test_no_shared_text() {
    let documents = vec![
        Document::new("a", "completely different words live in this first document here"),
        Document::new("b", UNRELATED),
    ];
    let result = detect_reuse(&documents, &ReuseParams::default(), false).unwrap();

    assert!(result.records.is_empty());
    assert_eq!(result.summary.target_documents, 0);
}

#[test]
fn test_thresholds_suppress_passage() {
    let documents = create_corpus();

    let long_only = ReuseParams {
        min_align: 100,
        ..Default::default()
    };
    assert!(detect_reuse(&documents, &long_only, false)
        .unwrap()
        .records
        .is_empty());

    let many_matches = ReuseParams {
        min_match: 10,
        ..Default::default()
    };
    assert!(detect_reuse(&documents, &many_matches, false)
        .unwrap()
        .records
        .is_empty());
}

#[test]
fn test_jsonl_corpus_round_trip() {
    let mut corpus = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
    for (id, text, year) in [
        ("src", source_text(), 1851),
        ("tgt", target_text(), 1852),
        ("other", UNRELATED.to_string(), 1853),
    ] {
        let line = serde_json::json!({ "id": id, "text": text, "year": year });
        writeln!(corpus, "{}", line).unwrap();
    }

    let fields = CorpusFields {
        metadata: vec!["year".to_string()],
        ..Default::default()
    };
    let documents = load_corpus(corpus.path(), &fields).unwrap();
    let result = detect_reuse(&documents, &ReuseParams::default(), false).unwrap();
    assert_eq!(result.records.len(), 1);

    let record = &result.records[0];
    assert!(record.source.metadata.contains_key("year"));
    assert!(record.target.metadata.contains_key("year"));

    let mut jsonl = Vec::new();
    write_jsonl(&result.records, &mut jsonl).unwrap();
    let line = String::from_utf8(jsonl).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(parsed["target"]["text"]["matched"], record.target.text.matched);

    let mut csv = Vec::new();
    write_csv(&result.records, &mut csv).unwrap();
    assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 2);
}

#[test]
fn test_sqlite_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corpus.sqlite");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE pages (name TEXT, body TEXT);")
        .unwrap();
    for doc in create_corpus() {
        conn.execute(
            "INSERT INTO pages (name, body) VALUES (?1, ?2)",
            rusqlite::params![doc.id, doc.text],
        )
        .unwrap();
    }
    drop(conn);

    let fields = CorpusFields {
        id: "name".to_string(),
        text: "body".to_string(),
        table: "pages".to_string(),
        ..Default::default()
    };
    let documents = load_corpus(&path, &fields).unwrap();
    assert_eq!(documents.len(), 3);

    let result = detect_reuse(&documents, &ReuseParams::default(), false).unwrap();
    assert_eq!(result.records.len(), 1);
    assert_eq!(refined_target_text(&result.records[0], &documents), PASSAGE);
}

#[test]
fn test_result_serializes_parameters() {
    let documents = create_corpus();
    let params = ReuseParams {
        context_gap: 150,
        ..Default::default()
    };
    let result = detect_reuse(&documents, &params, false).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["parameters"]["context_gap"], 150);
    assert_eq!(json["summary"]["record_count"], 1);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
