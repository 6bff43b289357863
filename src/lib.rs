//! Seriatim Text Reuse Detection Library
//!
//! Finds passages that one document copies from another across a corpus.
//! Rare word-anchored character n-grams propose candidate document pairs, a
//! probabilistic decoder turns the matches of each target into contiguous
//! spans, and a character-level search refines the span boundaries.
//!
//! # Example
//!
//! ```no_run
//! use seriatim::prelude::*;
//! use std::path::Path;
//!
//! let documents = load_corpus(Path::new("corpus.jsonl"), &CorpusFields::default()).unwrap();
//! let params = ReuseParams::default();
//!
//! let result = detect_reuse(&documents, &params, false).unwrap();
//!
//! for record in &result.records {
//!     println!("{} -> {}", record.source.id, record.target.id);
//!     println!("  {}", record.target.text.matched);
//! }
//! ```
//!
//! # Pairwise Example
//!
//! ```
//! use seriatim::prelude::*;
//!
//! let source = Document::new("a", "a handful of words nobody else wrote");
//! let target = Document::new("b", "entirely different words in this one");
//! let records = compare_documents(&source, &target, &ReuseParams::default()).unwrap();
//! assert!(records.is_empty());
//! ```

pub mod align;
pub mod compare;
pub mod db;
pub mod decode;
pub mod extract;
pub mod filter;
pub mod models;
pub mod output;
pub mod window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::align::{align_edge, search_boundary, SearchOutcome, BANDWIDTH};
    pub use crate::compare::{
        align_document, compare_documents, detect_reuse, extract_postings, fetch_text,
        CompareError,
    };
    pub use crate::db::{
        corpus_stats, index_documents, load_corpus, load_jsonl_corpus, load_sqlite_corpus,
        CorpusFields, DbError,
    };
    pub use crate::decode::{decode_sources, DecodeError};
    pub use crate::extract::{extract_shingles, feature_key, term_frequencies, unique_postings};
    pub use crate::filter::{build_match_groups, document_frequencies, group_matches, DocumentPostings};
    pub use crate::models::{
        AlignedEdge, ConfigError, CorpusStats, DocId, Document, FeatureKey, Match, MatchGroup,
        Occurrence, PairFilter, PassageRef, PassageText, Posting, ReuseParams, ReuseRecord,
        ReuseResult, ReuseSummary, Side, SourceMatch, Span, SpanEdge, TargetMatches,
    };
    pub use crate::output::{
        format_record, print_corpus_stats, print_records, print_summary, write_csv,
        write_csv_file, write_json, write_json_file, write_jsonl, write_jsonl_file, OutputError,
    };
    pub use crate::window::{clamp_range, expand_span_edges};
}

// Re-export commonly used types at the crate root
pub use models::{Document, ReuseParams, ReuseRecord, ReuseResult};
