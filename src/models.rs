//! Data structures for the seriatim text reuse pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Stable 64-bit document identifier derived from the corpus id string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub u64);

impl DocId {
    /// Hash a corpus id into a `DocId` (first 8 bytes of its blake3 digest).
    pub fn from_name(name: &str) -> Self {
        let hash = blake3::hash(name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        DocId(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A corpus document as handed to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub uid: DocId,
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            uid: DocId::from_name(&id),
            id,
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Length of the text in characters (the unit of every offset).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// One shingle occurrence produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub feature: String,
    pub start: usize,
}

/// Hashed fixed-width feature key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureKey(pub u64);

/// A frequency-1 shingle of one document, keyed by its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub feature: FeatureKey,
    pub start: usize,
}

/// One shared-feature alignment point between a target and a candidate source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub source_id: DocId,
    pub source_pos: usize,
    pub target_pos: usize,
}

/// A candidate source position inside a `MatchGroup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMatch {
    pub source_id: DocId,
    pub source_pos: usize,
}

/// All candidate sources sharing the feature that starts at `target_pos`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    pub target_pos: usize,
    pub matches: Vec<SourceMatch>,
}

/// Every match group of one target document, ascending by target offset.
#[derive(Debug, Clone)]
pub struct TargetMatches {
    pub target_id: DocId,
    pub groups: Vec<MatchGroup>,
}

/// A run of the target attributed to one source document.
///
/// `*_end` offsets are exclusive and include the width of the final shingle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub source_id: DocId,
    pub target_begin: usize,
    pub target_end: usize,
    pub source_begin: usize,
    pub source_end: usize,
}

impl Span {
    pub fn target_len(&self) -> usize {
        self.target_end - self.target_begin
    }

    pub fn source_len(&self) -> usize {
        self.source_end.saturating_sub(self.source_begin)
    }
}

/// A span plus the context windows the boundary aligner may look into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEdge {
    pub span: Span,
    pub left_context_target: usize,
    pub right_context_target: usize,
    pub left_context_source: usize,
    pub right_context_source: usize,
}

/// Which edge of a span is being aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Best boundary extension on one side of a span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedEdge {
    pub source: String,
    pub target: String,
}

impl AlignedEdge {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.target.is_empty()
    }
}

/// Which ordered document pairs are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairFilter {
    /// Source uid < target uid, so each pair is evaluated once.
    #[default]
    SourceBeforeTarget,
    /// Source uid > target uid.
    TargetBeforeSource,
    /// Every ordered pair of distinct documents.
    AllPairs,
}

impl PairFilter {
    #[inline]
    pub fn accepts(self, source: DocId, target: DocId) -> bool {
        match self {
            PairFilter::SourceBeforeTarget => source < target,
            PairFilter::TargetBeforeSource => source > target,
            PairFilter::AllPairs => source != target,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("n-gram order must be positive")]
    ZeroNgram,
    #[error("minimum document frequency must be positive")]
    ZeroMinDf,
    #[error("minimum document frequency {min_df} exceeds maximum {max_df}")]
    DfRange { min_df: usize, max_df: usize },
    #[error("minimum match count must be positive")]
    ZeroMinMatch,
    #[error("minimum alignment length must be positive")]
    ZeroMinAlign,
}

/// Run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReuseParams {
    pub ngram_size: usize,
    pub min_df: usize,
    pub max_df: usize,
    pub min_match: usize,
    pub max_gap: usize,
    pub min_align: usize,
    pub floating_ngrams: bool,
    pub context_gap: usize, // radius of the windows handed to the aligner
    pub pair_filter: PairFilter,
}

impl Default for ReuseParams {
    fn default() -> Self {
        Self {
            ngram_size: 20,
            min_df: 2,
            max_df: 100,
            min_match: 5,
            max_gap: 600,
            min_align: 50,
            floating_ngrams: false,
            context_gap: 200,
            pair_filter: PairFilter::SourceBeforeTarget,
        }
    }
}

impl ReuseParams {
    /// Reject configurations that cannot produce meaningful output.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ngram_size == 0 {
            return Err(ConfigError::ZeroNgram);
        }
        if self.min_df == 0 {
            return Err(ConfigError::ZeroMinDf);
        }
        if self.min_df > self.max_df {
            return Err(ConfigError::DfRange {
                min_df: self.min_df,
                max_df: self.max_df,
            });
        }
        if self.min_match == 0 {
            return Err(ConfigError::ZeroMinMatch);
        }
        if self.min_align == 0 {
            return Err(ConfigError::ZeroMinAlign);
        }
        Ok(())
    }
}

// ============================================================================
// Pipeline output
// ============================================================================

/// Text around and inside one side of a detected passage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassageText {
    pub prefix: String,
    pub matched: String,
    pub suffix: String,
}

/// One side (source or target) of a reuse record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageRef {
    pub id: String,
    pub uid: DocId,
    pub begin: usize,
    pub end: usize,
    pub left_context: usize,
    pub right_context: usize,
    /// Boundaries after character-level alignment.
    pub refined: (usize, usize),
    pub text: PassageText,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Final output unit: one detected passage with both aligned edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReuseRecord {
    pub source: PassageRef,
    pub target: PassageRef,
    pub left_alignment: AlignedEdge,
    pub right_alignment: AlignedEdge,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReuseSummary {
    pub documents: usize,
    pub target_documents: usize,
    pub failed_documents: usize,
    pub record_count: usize,
    pub aligned_characters: usize,
}

/// Full run result.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReuseResult {
    pub version: String,
    pub parameters: ReuseParams,
    pub summary: ReuseSummary,
    pub records: Vec<ReuseRecord>,
}

/// Corpus statistics
#[derive(Debug, Serialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub total_chars: usize,
    pub mean_chars: f64,
    pub max_chars: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_is_stable() {
        assert_eq!(DocId::from_name("doc-1"), DocId::from_name("doc-1"));
        assert_ne!(DocId::from_name("doc-1"), DocId::from_name("doc-2"));
    }

    #[test]
    fn test_default_params_validate() {
        assert!(ReuseParams::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let params = ReuseParams {
            ngram_size: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::ZeroNgram));

        let params = ReuseParams {
            min_df: 10,
            max_df: 5,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigError::DfRange {
                min_df: 10,
                max_df: 5
            })
        );

        let params = ReuseParams {
            min_match: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::ZeroMinMatch));
    }

    #[test]
    fn test_pair_filter() {
        let a = DocId(1);
        let b = DocId(2);
        assert!(PairFilter::SourceBeforeTarget.accepts(a, b));
        assert!(!PairFilter::SourceBeforeTarget.accepts(b, a));
        assert!(PairFilter::TargetBeforeSource.accepts(b, a));
        assert!(PairFilter::AllPairs.accepts(a, b));
        assert!(PairFilter::AllPairs.accepts(b, a));
        assert!(!PairFilter::AllPairs.accepts(a, a));
    }

    #[test]
    fn test_span_lengths() {
        let span = Span {
            source_id: DocId(7),
            target_begin: 10,
            target_end: 70,
            source_begin: 5,
            source_end: 80,
        };
        assert_eq!(span.target_len(), 60);
        assert_eq!(span.source_len(), 75);
    }
}
