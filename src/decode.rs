//! Source decoding for one target document.
//!
//! A single left-to-right dynamic program over target offsets, in natural-log
//! probability space. Every candidate source keeps one live hypothesis; a
//! background hypothesis accounts for target text not copied from anything.
//! At each match group a source either continues its current run or switches
//! in fresh from the background, and a strong run may hand its ending back to
//! the background so later runs can build on it. The best path is recovered
//! from an explicit backpointer map and collapsed into spans.

use crate::models::{DocId, MatchGroup, ReuseParams, Span};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Probability that an aligned character is copied verbatim.
const COPY_PROB: f64 = 0.8;
/// Probability of staying in the current state for one more character.
const CONTINUE_PROB: f64 = 0.998;
const ALPHABET_SIZE: f64 = 256.0;
/// Extra prior paid whenever a new run starts.
const SWITCH_PRIOR: f64 = 0.001;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("match groups out of order: target offset {found} follows {previous}")]
    UnorderedGroups { previous: usize, found: usize },
    #[error("source {source_id} listed twice at target offset {target_pos}")]
    DuplicateSource { source_id: DocId, target_pos: usize },
    #[error("backpointer chain broken at target offset {target_pos}")]
    BrokenPath { target_pos: usize },
}

/// Log-probabilities derived from the model constants.
#[derive(Debug, Clone, Copy)]
struct LogProbs {
    copy: f64,
    miss: f64,
    stop: f64,
    cont: f64,
    switch: f64,
    switch_prior: f64,
    /// One background character: stay, then emit any symbol.
    background: f64,
    /// One copied character inside a run.
    run: f64,
}

impl LogProbs {
    fn new() -> Self {
        let copy = COPY_PROB.ln();
        let cont = CONTINUE_PROB.ln();
        Self {
            copy,
            miss: (1.0 - COPY_PROB).ln() - (2.0 * ALPHABET_SIZE).ln(),
            stop: ((1.0 + COPY_PROB) / 2.0).ln(),
            cont,
            switch: (1.0 - CONTINUE_PROB).ln(),
            switch_prior: SWITCH_PRIOR.ln(),
            background: cont - ALPHABET_SIZE.ln(),
            run: cont + copy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Label {
    Background,
    Source(DocId),
}

/// A decision point on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StepKey {
    label: Label,
    target_pos: usize,
    source_pos: usize,
}

impl StepKey {
    const fn background(target_pos: usize) -> Self {
        Self {
            label: Label::Background,
            target_pos,
            source_pos: 0,
        }
    }
}

/// Terminal sentinel of every backpointer chain.
const START: StepKey = StepKey::background(0);

/// Live state of one label.
#[derive(Debug, Clone, Copy)]
struct Hypothesis {
    target_pos: usize,
    source_pos: usize,
    score: f64,
}

const ORIGIN: Hypothesis = Hypothesis {
    target_pos: 0,
    source_pos: 0,
    score: 0.0,
};

const UNSEEN: Hypothesis = Hypothesis {
    target_pos: 0,
    source_pos: 0,
    score: f64::NEG_INFINITY,
};

/// Gaps between a label's previous match and the current one.
#[derive(Debug, Clone, Copy)]
struct Gaps {
    source: usize,
    target: usize,
}

impl Gaps {
    fn between(prev: &Hypothesis, target_pos: usize, source_pos: usize, n: usize) -> Self {
        Self {
            source: source_pos.saturating_sub(prev.source_pos + n),
            target: target_pos.saturating_sub(prev.target_pos + n),
        }
    }
}

/// Score of extending `prev` with a match at (`target_pos`, `source_pos`).
///
/// The overlapping part of the two gaps is charged as copies with at least
/// one substitution per shingle width; the rest of the target gap as misses.
fn continuation_score(
    lp: &LogProbs,
    prev: &Hypothesis,
    gaps: Gaps,
    target_pos: usize,
    n: usize,
) -> f64 {
    let overlap = gaps.source.min(gaps.target);
    let min_sub = overlap.div_ceil(n);
    let min_err = min_sub + gaps.target - overlap;
    let advance = n.min(target_pos - prev.target_pos);

    prev.score
        + gaps.target as f64 * lp.cont
        + min_err as f64 * lp.miss
        + (overlap - min_sub) as f64 * lp.copy
        + advance as f64 * lp.run
}

/// Check the decoder's input preconditions.
fn validate_groups(groups: &[MatchGroup]) -> Result<(), DecodeError> {
    let mut seen = HashSet::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 && group.target_pos <= groups[i - 1].target_pos {
            return Err(DecodeError::UnorderedGroups {
                previous: groups[i - 1].target_pos,
                found: group.target_pos,
            });
        }
        seen.clear();
        for m in &group.matches {
            if !seen.insert(m.source_id) {
                return Err(DecodeError::DuplicateSource {
                    source_id: m.source_id,
                    target_pos: group.target_pos,
                });
            }
        }
    }
    Ok(())
}

/// Partition a target document into spans copied from candidate sources.
///
/// `groups` must be strictly ascending by target offset. Sources with fewer
/// than `min_match` matches in the whole document are ignored, and spans
/// shorter than `min_align` target characters are dropped.
pub fn decode_sources(groups: &[MatchGroup], params: &ReuseParams) -> Result<Vec<Span>, DecodeError> {
    validate_groups(groups)?;

    let n = params.ngram_size;
    if groups.is_empty() || n == 0 {
        return Ok(Vec::new());
    }

    let lp = LogProbs::new();

    let mut match_counts: HashMap<DocId, usize> = HashMap::new();
    for group in groups {
        for m in &group.matches {
            *match_counts.entry(m.source_id).or_default() += 1;
        }
    }

    let mut backpointers: HashMap<StepKey, StepKey> = HashMap::new();
    let mut live: HashMap<DocId, Hypothesis> = HashMap::new();
    let mut background_history = vec![ORIGIN];
    let mut last = 0usize;

    for group in groups {
        let t = group.target_pos;
        let stride = t - last;

        // Latest background state that ends at or before this offset
        let bg_last = background_history
            .iter()
            .rev()
            .find(|h| h.target_pos <= t)
            .copied()
            .unwrap_or(ORIGIN);
        let bg_origin = StepKey::background(bg_last.target_pos);
        let bg = bg_last.score + (t - bg_last.target_pos) as f64 * lp.background;

        let bg_key = StepKey::background(t + n);
        let mut background = Hypothesis {
            target_pos: t + n,
            source_pos: 0,
            score: bg + n as f64 * lp.background,
        };
        backpointers.insert(bg_key, bg_origin);

        for m in &group.matches {
            if match_counts.get(&m.source_id).copied().unwrap_or(0) < params.min_match {
                continue;
            }

            let label = Label::Source(m.source_id);
            let key = StepKey {
                label,
                target_pos: t,
                source_pos: m.source_pos,
            };

            let previous = live.get(&m.source_id).copied();
            let same = previous.unwrap_or(UNSEEN);
            let gaps = Gaps::between(&same, t, m.source_pos, n);
            let cont = continuation_score(&lp, &same, gaps, t, n);
            let switch = bg + lp.switch + lp.switch_prior + n as f64 * lp.run;

            let must_switch = gaps.target > params.max_gap
                || gaps.source > params.max_gap
                || m.source_pos < same.source_pos
                || switch >= cont;

            // Matches within one shingle width of the previous group continue,
            // unless the source has no run to continue yet
            let score = if must_switch && (stride > n || previous.is_none()) {
                backpointers.insert(key, bg_origin);
                switch
            } else {
                backpointers.insert(
                    key,
                    StepKey {
                        label,
                        target_pos: same.target_pos,
                        source_pos: same.source_pos,
                    },
                );
                cont
            };

            live.insert(
                m.source_id,
                Hypothesis {
                    target_pos: t,
                    source_pos: m.source_pos,
                    score,
                },
            );

            let stop = score + lp.stop + lp.switch;
            if stop > background.score {
                background = Hypothesis {
                    target_pos: t + n,
                    source_pos: 0,
                    score: stop,
                };
                backpointers.insert(bg_key, key);
            }
        }

        last = t;
        background_history.push(background);
    }

    let path = trace_path(&backpointers, StepKey::background(last + n))?;
    Ok(collapse_path(&path, n, params.min_align))
}

/// Walk backpointers from `end` to the start sentinel, returning the path in
/// forward order (start excluded).
fn trace_path(
    backpointers: &HashMap<StepKey, StepKey>,
    end: StepKey,
) -> Result<Vec<StepKey>, DecodeError> {
    let mut path = Vec::new();
    let mut cur = end;
    while cur != START {
        path.push(cur);
        cur = *backpointers
            .get(&cur)
            .ok_or(DecodeError::BrokenPath {
                target_pos: cur.target_pos,
            })?;
    }
    path.reverse();
    Ok(path)
}

/// Merge maximal same-source runs into spans, dropping short ones.
fn collapse_path(path: &[StepKey], n: usize, min_align: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut i = 0;

    while i < path.len() {
        let Label::Source(source_id) = path[i].label else {
            i += 1;
            continue;
        };

        let mut j = i;
        while j + 1 < path.len() && path[j + 1].label == path[i].label {
            j += 1;
        }

        let (first, last) = (path[i], path[j]);
        let span = Span {
            source_id,
            target_begin: first.target_pos,
            target_end: last.target_pos + n,
            source_begin: first.source_pos,
            source_end: last.source_pos + n,
        };
        if span.target_len() >= min_align {
            spans.push(span);
        }

        i = j + 1;
    }

    spans
}
