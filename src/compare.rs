//! Reuse detection pipeline.
//!
//! Coordinates the full run over a corpus: shingle extraction, candidate
//! pair building, then per target document decoding, context expansion and
//! boundary alignment. Target documents are processed in parallel and a
//! failure in one of them never aborts the others.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::align::align_edge;
use crate::db::index_documents;
use crate::decode::{decode_sources, DecodeError};
use crate::extract::unique_postings;
use crate::filter::{build_match_groups, DocumentPostings};
use crate::models::*;
use crate::window::{clamp_range, expand_span_edges};

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("decoding document {doc} failed: {source}")]
    Decode { doc: String, source: DecodeError },
}

/// Extract the unique postings of every document in parallel.
pub fn extract_postings(documents: &[Document], params: &ReuseParams) -> Vec<DocumentPostings> {
    documents
        .par_iter()
        .map(|doc| DocumentPostings {
            uid: doc.uid,
            postings: unique_postings(&doc.text, params.ngram_size, params.floating_ngrams),
        })
        .collect()
}

/// Copy the characters in `[begin, end)`, clamped to the text.
pub fn fetch_text(chars: &[char], begin: usize, end: usize) -> String {
    let (begin, end) = clamp_range(begin, end, chars.len());
    chars[begin..end].iter().collect()
}

/// Materialize one side of a span edge: offsets clamped, texts fetched.
fn passage_side(
    doc: &Document,
    chars: &[char],
    (left, begin, end, right): (usize, usize, usize, usize),
    n: usize,
) -> PassageRef {
    let matched_end = end.saturating_sub(n).max(begin);
    let (left, _) = clamp_range(left, begin, chars.len());
    let right = right.min(chars.len());

    PassageRef {
        id: doc.id.clone(),
        uid: doc.uid,
        begin,
        end,
        left_context: left,
        right_context: right,
        refined: (begin, matched_end),
        text: PassageText {
            prefix: fetch_text(chars, left, begin),
            matched: fetch_text(chars, begin, matched_end),
            suffix: fetch_text(chars, matched_end, right),
        },
        metadata: doc.metadata.clone(),
    }
}

/// Align both edges of a span and assemble the output record.
///
/// The suffix starts at the last matched shingle, so the right edge is
/// aligned from inside the span outward.
fn build_record(
    edge: &SpanEdge,
    source: &Document,
    source_chars: &[char],
    target: &Document,
    target_chars: &[char],
    n: usize,
) -> ReuseRecord {
    let span = edge.span;
    let mut source_side = passage_side(
        source,
        source_chars,
        (
            edge.left_context_source,
            span.source_begin,
            span.source_end,
            edge.right_context_source,
        ),
        n,
    );
    let mut target_side = passage_side(
        target,
        target_chars,
        (
            edge.left_context_target,
            span.target_begin,
            span.target_end,
            edge.right_context_target,
        ),
        n,
    );

    let left = align_edge(&source_side.text.prefix, &target_side.text.prefix, Side::Left);
    let right = align_edge(&source_side.text.suffix, &target_side.text.suffix, Side::Right);
    if left.is_empty() && right.is_empty() {
        debug!(source = %source.id, target = %target.id, "span boundaries not extended");
    }

    for (side, left_len, right_len) in [
        (&mut source_side, left.source.chars().count(), right.source.chars().count()),
        (&mut target_side, left.target.chars().count(), right.target.chars().count()),
    ] {
        let (begin, matched_end) = side.refined;
        side.refined = (begin.saturating_sub(left_len), matched_end + right_len);
    }

    ReuseRecord {
        source: source_side,
        target: target_side,
        left_alignment: left,
        right_alignment: right,
    }
}

/// Decode, expand and align one target document.
pub fn align_document(
    target: &Document,
    groups: &[MatchGroup],
    documents: &HashMap<DocId, &Document>,
    params: &ReuseParams,
) -> Result<Vec<ReuseRecord>, DecodeError> {
    let spans = decode_sources(groups, params)?;
    debug!(doc = %target.id, groups = groups.len(), spans = spans.len(), "decoded target");

    if spans.is_empty() {
        return Ok(Vec::new());
    }

    let target_chars: Vec<char> = target.text.chars().collect();
    let mut source_chars: HashMap<DocId, Vec<char>> = HashMap::new();
    let mut records = Vec::with_capacity(spans.len());

    for edge in expand_span_edges(&spans, params.context_gap) {
        let Some(source) = documents.get(&edge.span.source_id) else {
            warn!(doc = %target.id, source = %edge.span.source_id, "span source not in corpus");
            continue;
        };
        debug!(
            doc = %target.id,
            source = %source.id,
            target_chars = edge.span.target_len(),
            source_chars = edge.span.source_len(),
            "aligning span edges"
        );
        let chars = source_chars
            .entry(source.uid)
            .or_insert_with(|| source.text.chars().collect());

        records.push(build_record(
            &edge,
            source,
            chars,
            target,
            &target_chars,
            params.ngram_size,
        ));
    }

    Ok(records)
}

/// Align every target in parallel. A target whose decoding fails is logged
/// and skipped; returns the records of the rest and the failure count.
fn align_targets(
    targets: &[TargetMatches],
    documents: &HashMap<DocId, &Document>,
    params: &ReuseParams,
    progress: Option<&ProgressBar>,
) -> (Vec<ReuseRecord>, usize) {
    let outcomes: Vec<Option<Vec<ReuseRecord>>> = targets
        .par_iter()
        .map(|target_matches| {
            let outcome = match documents.get(&target_matches.target_id) {
                Some(target) => {
                    match align_document(target, &target_matches.groups, documents, params) {
                        Ok(records) => Some(records),
                        Err(e) => {
                            warn!(doc = %target.id, error = %e, "skipping document");
                            None
                        }
                    }
                }
                None => Some(Vec::new()),
            };

            if let Some(pb) = progress {
                pb.inc(1);
            }
            outcome
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.is_none()).count();
    let records = outcomes.into_iter().flatten().flatten().collect();
    (records, failed)
}

/// Run reuse detection over a whole corpus.
pub fn detect_reuse(
    documents: &[Document],
    params: &ReuseParams,
    show_progress: bool,
) -> Result<ReuseResult, CompareError> {
    params.validate()?;

    info!(
        documents = documents.len(),
        ngram_size = params.ngram_size,
        "extracting shingles"
    );
    let postings = extract_postings(documents, params);

    let targets = build_match_groups(&postings, params);
    info!(targets = targets.len(), "built candidate match groups");

    let by_uid = index_documents(documents);

    let progress = if show_progress {
        let pb = ProgressBar::new(targets.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let (records, failed_documents) = align_targets(&targets, &by_uid, params, progress.as_ref());

    if let Some(pb) = progress {
        pb.finish_with_message("Done");
    }

    let summary = ReuseSummary {
        documents: documents.len(),
        target_documents: targets.len(),
        failed_documents,
        record_count: records.len(),
        aligned_characters: records
            .iter()
            .map(|r| r.target.refined.1.saturating_sub(r.target.refined.0))
            .sum(),
    };
    info!(
        records = summary.record_count,
        failed = summary.failed_documents,
        "reuse detection finished"
    );

    Ok(ReuseResult {
        version: env!("CARGO_PKG_VERSION").to_string(),
        parameters: params.clone(),
        summary,
        records,
    })
}

/// Find passages of `target` copied from `source`.
///
/// Document frequency bounds and the pair predicate are ignored; every
/// feature the two texts share exactly once counts.
pub fn compare_documents(
    source: &Document,
    target: &Document,
    params: &ReuseParams,
) -> Result<Vec<ReuseRecord>, CompareError> {
    params.validate()?;

    let pair_params = ReuseParams {
        min_df: 2,
        max_df: 2,
        pair_filter: PairFilter::AllPairs,
        ..params.clone()
    };
    let pair = [source.clone(), target.clone()];
    let postings = extract_postings(&pair, &pair_params);

    let Some(target_matches) = build_match_groups(&postings, &pair_params)
        .into_iter()
        .find(|t| t.target_id == target.uid)
    else {
        return Ok(Vec::new());
    };

    let by_uid = index_documents(&pair);
    align_document(target, &target_matches.groups, &by_uid, params).map_err(|source| {
        CompareError::Decode {
            doc: target.id.clone(),
            source,
        }
    })
}
