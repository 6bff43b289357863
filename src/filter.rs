//! Candidate pair construction.
//!
//! Builds an inverted index of frequency-1 shingles, keeps features whose
//! document frequency falls inside the configured bounds, joins documents
//! that share them and groups the resulting matches per target document in
//! the order the decoder expects.

use crate::models::{DocId, FeatureKey, Match, MatchGroup, Posting, ReuseParams, SourceMatch, TargetMatches};
use std::collections::HashMap;

/// The unique postings of one document.
#[derive(Debug, Clone)]
pub struct DocumentPostings {
    pub uid: DocId,
    pub postings: Vec<Posting>,
}

/// Number of documents containing each feature.
pub fn document_frequencies(docs: &[DocumentPostings]) -> HashMap<FeatureKey, usize> {
    let mut df: HashMap<FeatureKey, usize> = HashMap::new();
    for doc in docs {
        for posting in &doc.postings {
            *df.entry(posting.feature).or_default() += 1;
        }
    }
    df
}

/// Build an index mapping features to (document index, offset) entries.
fn build_feature_index(docs: &[DocumentPostings]) -> HashMap<FeatureKey, Vec<(usize, usize)>> {
    let mut index: HashMap<FeatureKey, Vec<(usize, usize)>> = HashMap::new();
    for (doc_idx, doc) in docs.iter().enumerate() {
        for posting in &doc.postings {
            index
                .entry(posting.feature)
                .or_default()
                .push((doc_idx, posting.start));
        }
    }
    index
}

/// Produce the decoder input for every target document with candidates.
///
/// Document pairs sharing fewer than `min_match` in-range features are
/// dropped. Output is sorted by target id.
pub fn build_match_groups(docs: &[DocumentPostings], params: &ReuseParams) -> Vec<TargetMatches> {
    let index = build_feature_index(docs);

    // (target index, source index) -> shared features
    let mut pairs: HashMap<(usize, usize), Vec<Match>> = HashMap::new();

    for entries in index.values() {
        let df = entries.len();
        if df < params.min_df || df > params.max_df {
            continue;
        }

        for &(target_idx, target_pos) in entries {
            for &(source_idx, source_pos) in entries {
                if source_idx == target_idx {
                    continue;
                }
                let (source_id, target_id) = (docs[source_idx].uid, docs[target_idx].uid);
                if !params.pair_filter.accepts(source_id, target_id) {
                    continue;
                }
                pairs.entry((target_idx, source_idx)).or_default().push(Match {
                    source_id,
                    source_pos,
                    target_pos,
                });
            }
        }
    }

    let mut by_target: HashMap<usize, Vec<Match>> = HashMap::new();
    for ((target_idx, _), matches) in pairs {
        if matches.len() >= params.min_match {
            by_target.entry(target_idx).or_default().extend(matches);
        }
    }

    let mut targets: Vec<TargetMatches> = by_target
        .into_iter()
        .map(|(target_idx, matches)| TargetMatches {
            target_id: docs[target_idx].uid,
            groups: group_matches(matches),
        })
        .collect();
    targets.sort_by_key(|t| t.target_id);
    targets
}

/// Group raw matches by target offset, ascending.
///
/// Within a group each source appears once; when a source maps several
/// positions onto the same target offset the last (greatest) source offset
/// wins. Candidates inside a group are ordered by source id.
pub fn group_matches(mut matches: Vec<Match>) -> Vec<MatchGroup> {
    matches.sort_unstable_by_key(|m| (m.target_pos, m.source_id, m.source_pos));

    let mut groups: Vec<MatchGroup> = Vec::new();
    for m in matches {
        let candidate = SourceMatch {
            source_id: m.source_id,
            source_pos: m.source_pos,
        };

        match groups.last_mut() {
            Some(group) if group.target_pos == m.target_pos => {
                match group.matches.last_mut() {
                    Some(prev) if prev.source_id == m.source_id => *prev = candidate,
                    _ => group.matches.push(candidate),
                }
            }
            _ => groups.push(MatchGroup {
                target_pos: m.target_pos,
                matches: vec![candidate],
            }),
        }
    }

    groups
}
