//! Corpus loading from JSON-lines files and SQLite databases.

use crate::models::{CorpusStats, DocId, Document};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
    #[error("line {0} is not a JSON object")]
    NotAnObject(usize),
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("duplicate document id: {0}")]
    DuplicateDocument(String),
}

/// Where to find ids, texts and metadata in the input records.
#[derive(Debug, Clone)]
pub struct CorpusFields {
    pub id: String,
    pub text: String,
    /// Extra fields copied through to the output.
    pub metadata: Vec<String>,
    /// Table to read from SQLite inputs.
    pub table: String,
}

impl Default for CorpusFields {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            text: "text".to_string(),
            metadata: Vec::new(),
            table: "documents".to_string(),
        }
    }
}

/// Load a corpus, choosing the reader from the file extension.
pub fn load_corpus(path: &Path, fields: &CorpusFields) -> Result<Vec<Document>, DbError> {
    let is_sqlite = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("db" | "sqlite" | "sqlite3")
    );
    let documents = if is_sqlite {
        load_sqlite_corpus(path, fields)?
    } else {
        load_jsonl_corpus(path, fields)?
    };
    info!(path = %path.display(), documents = documents.len(), "loaded corpus");
    Ok(documents)
}

/// Load one JSON object per line. Records without an id or text are skipped.
pub fn load_jsonl_corpus(path: &Path, fields: &CorpusFields) -> Result<Vec<Document>, DbError> {
    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let value: serde_json::Value =
            serde_json::from_str(&line).map_err(|source| DbError::Json {
                line: line_no,
                source,
            })?;
        let serde_json::Value::Object(mut record) = value else {
            return Err(DbError::NotAnObject(line_no));
        };

        let id = match record.get(&fields.id) {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let text = match record.remove(&fields.text) {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        };
        let (Some(id), Some(text)) = (id, text) else {
            debug!(line = line_no, "skipping record without id or text");
            skipped += 1;
            continue;
        };

        let mut doc = Document::new(id, text);
        for field in &fields.metadata {
            if let Some(value) = record.remove(field) {
                doc.metadata.insert(field.clone(), value);
            }
        }
        documents.push(doc);
    }

    if skipped > 0 {
        warn!(skipped, "skipped records with missing id or text");
    }
    check_unique_ids(&documents)?;
    Ok(documents)
}

/// Load documents from a SQLite table.
pub fn load_sqlite_corpus(path: &Path, fields: &CorpusFields) -> Result<Vec<Document>, DbError> {
    let mut columns = vec![fields.id.as_str(), fields.text.as_str()];
    columns.extend(fields.metadata.iter().map(String::as_str));
    check_identifier(&fields.table)?;
    for ident in &columns {
        check_identifier(ident)?;
    }

    let conn = Connection::open(path)?;
    let sql = format!("SELECT {} FROM {}", columns.join(", "), fields.table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut documents = Vec::new();
    let mut skipped = 0usize;

    while let Some(row) = rows.next()? {
        let id = match row.get_ref(0)? {
            ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Integer(i) => Some(i.to_string()),
            _ => None,
        };
        let text = match row.get_ref(1)? {
            ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        };
        let (Some(id), Some(text)) = (id, text) else {
            skipped += 1;
            continue;
        };

        let mut doc = Document::new(id, text);
        for (offset, field) in fields.metadata.iter().enumerate() {
            doc.metadata
                .insert(field.clone(), sql_to_json(row.get_ref(offset + 2)?));
        }
        documents.push(doc);
    }

    if skipped > 0 {
        warn!(skipped, table = %fields.table, "skipped rows with missing id or text");
    }
    check_unique_ids(&documents)?;
    Ok(documents)
}

fn sql_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Accept only plain identifiers, since they are spliced into SQL.
fn check_identifier(ident: &str) -> Result<(), DbError> {
    let mut chars = ident.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(ident.to_string()))
    }
}

fn check_unique_ids(documents: &[Document]) -> Result<(), DbError> {
    let mut seen = HashSet::with_capacity(documents.len());
    for doc in documents {
        if !seen.insert(doc.uid) {
            return Err(DbError::DuplicateDocument(doc.id.clone()));
        }
    }
    Ok(())
}

/// Summarize document lengths.
pub fn corpus_stats(documents: &[Document]) -> CorpusStats {
    let lengths: Vec<usize> = documents.iter().map(Document::char_len).collect();
    let total_chars: usize = lengths.iter().sum();

    CorpusStats {
        documents: documents.len(),
        total_chars,
        mean_chars: if documents.is_empty() {
            0.0
        } else {
            total_chars as f64 / documents.len() as f64
        },
        max_chars: lengths.iter().copied().max().unwrap_or(0),
    }
}

/// Index documents by uid for text fetching.
pub fn index_documents(documents: &[Document]) -> HashMap<DocId, &Document> {
    documents.iter().map(|doc| (doc.uid, doc)).collect()
}
