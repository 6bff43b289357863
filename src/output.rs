//! Output formatting for reuse results (JSON, JSON lines, CSV, console).

use crate::models::{CorpusStats, ReuseRecord, ReuseResult};
use std::borrow::Cow;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the full result as pretty-printed JSON.
pub fn write_json<W: Write>(result: &ReuseResult, writer: &mut W) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut *writer, result)?;
    writeln!(writer)?;
    Ok(())
}

/// Write the full result as JSON to a file.
pub fn write_json_file(result: &ReuseResult, path: &Path) -> Result<(), OutputError> {
    let mut file = BufWriter::new(std::fs::File::create(path)?);
    write_json(result, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Write one JSON record per line.
pub fn write_jsonl<W: Write>(records: &[ReuseRecord], writer: &mut W) -> Result<(), OutputError> {
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Write records as JSON lines to a file.
pub fn write_jsonl_file(records: &[ReuseRecord], path: &Path) -> Result<(), OutputError> {
    let mut file = BufWriter::new(std::fs::File::create(path)?);
    write_jsonl(records, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Write records as CSV.
pub fn write_csv<W: Write>(records: &[ReuseRecord], writer: &mut W) -> Result<(), OutputError> {
    writeln!(
        writer,
        "source_id,source_begin,source_end,source_refined_begin,source_refined_end,\
         target_id,target_begin,target_end,target_refined_begin,target_refined_end,\
         left_source,left_target,right_source,right_target,source_text,target_text"
    )?;

    for r in records {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&r.source.id),
            r.source.begin,
            r.source.end,
            r.source.refined.0,
            r.source.refined.1,
            csv_field(&r.target.id),
            r.target.begin,
            r.target.end,
            r.target.refined.0,
            r.target.refined.1,
            csv_field(&r.left_alignment.source),
            csv_field(&r.left_alignment.target),
            csv_field(&r.right_alignment.source),
            csv_field(&r.right_alignment.target),
            csv_field(&r.source.text.matched),
            csv_field(&r.target.text.matched),
        )?;
    }

    Ok(())
}

/// Write records as CSV to a file.
pub fn write_csv_file(records: &[ReuseRecord], path: &Path) -> Result<(), OutputError> {
    let mut file = BufWriter::new(std::fs::File::create(path)?);
    write_csv(records, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Write a summary report to stdout.
pub fn print_summary(result: &ReuseResult) {
    let p = &result.parameters;
    println!("\n=== Reuse Summary ===");
    println!("Version: {}", result.version);
    println!();
    println!("Parameters:");
    println!("  N-gram order: {}", p.ngram_size);
    println!("  Document frequency: {}..={}", p.min_df, p.max_df);
    println!("  Min matches: {}", p.min_match);
    println!("  Max gap: {}", p.max_gap);
    println!("  Min alignment: {}", p.min_align);
    println!("  Context gap: {}", p.context_gap);
    println!("  Floating n-grams: {}", p.floating_ngrams);
    println!("  Pair filter: {:?}", p.pair_filter);
    println!();
    println!("Results:");
    println!("  Documents: {}", result.summary.documents);
    println!("  Target documents: {}", result.summary.target_documents);
    println!("  Failed documents: {}", result.summary.failed_documents);
    println!("  Passages found: {}", result.summary.record_count);
    println!("  Aligned characters: {}", result.summary.aligned_characters);
}

/// Print corpus statistics to stdout.
pub fn print_corpus_stats(stats: &CorpusStats) {
    println!("=== Corpus Statistics ===");
    println!("Documents: {}", stats.documents);
    println!("Total characters: {}", stats.total_chars);
    println!("Mean characters: {:.1}", stats.mean_chars);
    println!("Longest document: {}", stats.max_chars);
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// Format a record as a human-readable string.
pub fn format_record(record: &ReuseRecord) -> String {
    format!(
        "{} [{}..{}] -> {} [{}..{}]\n  source: {}\n  target: {}",
        record.source.id,
        record.source.refined.0,
        record.source.refined.1,
        record.target.id,
        record.target.refined.0,
        record.target.refined.1,
        truncate_text(&record.source.text.matched, 80),
        truncate_text(&record.target.text.matched, 80),
    )
}

/// Print records to stdout.
pub fn print_records(records: &[ReuseRecord], limit: Option<usize>) {
    let to_print = match limit {
        Some(n) => &records[..n.min(records.len())],
        None => records,
    };

    for record in to_print {
        println!("{}", format_record(record));
    }

    if to_print.len() < records.len() {
        println!("... and {} more", records.len() - to_print.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlignedEdge, DocId, PassageRef, PassageText, ReuseParams, ReuseSummary};
    use std::collections::BTreeMap;

    fn passage(id: &str, matched: &str) -> PassageRef {
        PassageRef {
            id: id.to_string(),
            uid: DocId::from_name(id),
            begin: 10,
            end: 70,
            left_context: 0,
            right_context: 90,
            refined: (9, 72),
            text: PassageText {
                prefix: String::new(),
                matched: matched.to_string(),
                suffix: String::new(),
            },
            metadata: BTreeMap::new(),
        }
    }

    fn create_test_record() -> ReuseRecord {
        ReuseRecord {
            source: passage("src", "copied, \"quoted\" text"),
            target: passage("tgt", "copied text"),
            left_alignment: AlignedEdge::default(),
            right_alignment: AlignedEdge {
                source: "end".to_string(),
                target: "end".to_string(),
            },
        }
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        write_csv(&[create_test_record()], &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("source_id,"));
        assert!(lines[1].starts_with("src,10,70,9,72,tgt,"));
        assert!(lines[1].contains("\"copied, \"\"quoted\"\" text\""));
    }

    #[test]
    fn test_write_csv_empty() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_write_jsonl() {
        let records = vec![create_test_record(), create_test_record()];
        let mut buf = Vec::new();
        write_jsonl(&records, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();

        assert_eq!(out.lines().count(), 2);
        let parsed: serde_json::Value = serde_json::from_str(out.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["source"]["id"], "src");
        assert_eq!(parsed["right_alignment"]["target"], "end");
    }

    #[test]
    fn test_write_json() {
        let result = ReuseResult {
            version: "0.1.0".to_string(),
            parameters: ReuseParams::default(),
            summary: ReuseSummary::default(),
            records: vec![create_test_record()],
        };
        let mut buf = Vec::new();
        write_json(&result, &mut buf).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(parsed["parameters"]["ngram_size"], 20);
        assert_eq!(parsed["parameters"]["pair_filter"], "source_before_target");
        assert_eq!(parsed["records"][0]["target"]["refined"], serde_json::json!([9, 72]));
    }

    #[test]
    fn test_format_record() {
        let formatted = format_record(&create_test_record());
        assert!(formatted.starts_with("src [9..72] -> tgt [9..72]"));
        assert!(formatted.contains("copied text"));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
    }
}
