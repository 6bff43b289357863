//! Character-level boundary alignment for span edges.
//!
//! A uniform-cost search over an edit graph of (source cursor, target cursor)
//! states. Costs are negative log-probabilities, so the first time the fully
//! consumed state leaves the queue it is optimal. A finish move can jump to
//! the end from anywhere, paying for every target character left behind,
//! which lets the search stop where the two texts stop agreeing.
//!
//! Left edges are aligned by reversing both contexts, so the same search
//! serves both sides.

use crate::models::{AlignedEdge, Side};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Maximum cursor drift allowed for states that have not finished.
pub const BANDWIDTH: usize = 10;

const COPY_PROB: f64 = 0.8;
const ALPHABET_SIZE: f64 = 256.0;
const FINAL_PROB: f64 = 0.01;

/// Non-negative move costs.
#[derive(Debug, Clone, Copy)]
struct Costs {
    copy: f64,
    edit: f64,
    finish: f64,
    /// Per unconsumed target character when finishing.
    pad: f64,
}

impl Costs {
    fn new() -> Self {
        let stop = ((1.0 + COPY_PROB) / 2.0).ln();
        Self {
            copy: -COPY_PROB.ln(),
            edit: -((1.0 - COPY_PROB).ln() - (2.0 * ALPHABET_SIZE).ln()),
            finish: -(stop + 2.0 * FINAL_PROB.ln()),
            pad: -((1.0 - FINAL_PROB).ln() - ALPHABET_SIZE.ln()),
        }
    }
}

/// Edges of the search graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Finish,
    Delete,
    Copy,
    Substitute,
    Insert,
}

/// A search state. Finished states sit at the end of both strings and
/// remember where the alignment actually stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Cell {
    source: usize,
    target: usize,
    stopped_at: Option<(usize, usize)>,
}

impl Cell {
    #[inline]
    fn drift(&self) -> usize {
        self.source.abs_diff(self.target)
    }
}

/// Result of one boundary search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    /// Characters of the source context used by the best path.
    pub source_end: usize,
    /// Characters of the target context used by the best path.
    pub target_end: usize,
    pub cost: f64,
    /// States expanded before the goal was reached.
    pub explored: usize,
    /// Largest cursor drift among expanded states.
    pub max_drift: usize,
}

#[inline]
fn chars_match(a: char, b: char) -> bool {
    (a.is_whitespace() && b.is_whitespace()) || a.to_lowercase().eq(b.to_lowercase())
}

/// Find the cheapest alignment of `source` against `target`, both read from
/// the span edge outward.
pub fn search_boundary(source: &[char], target: &[char]) -> SearchOutcome {
    let costs = Costs::new();
    let (source_len, target_len) = (source.len(), target.len());

    let start = Cell {
        source: 0,
        target: 0,
        stopped_at: None,
    };
    let mut best: HashMap<Cell, f64> = HashMap::new();
    let mut queue = BinaryHeap::new();
    best.insert(start, 0.0);
    queue.push(Reverse((OrderedFloat(0.0), start)));

    let mut explored = 0usize;
    let mut max_drift = 0usize;

    while let Some(Reverse((OrderedFloat(cost), cell))) = queue.pop() {
        if cell.source == source_len && cell.target == target_len {
            let (source_end, target_end) = cell.stopped_at.unwrap_or((source_len, target_len));
            return SearchOutcome {
                source_end,
                target_end,
                cost,
                explored,
                max_drift,
            };
        }

        // Stale queue entry
        if best.get(&cell).is_some_and(|&known| cost > known) {
            continue;
        }

        explored += 1;
        max_drift = max_drift.max(cell.drift());

        let mut moves = [Move::Finish; 4];
        let mut count = 1;
        if cell.source < source_len {
            moves[count] = Move::Delete;
            count += 1;
            if cell.target < target_len {
                moves[count] = if chars_match(source[cell.source], target[cell.target]) {
                    Move::Copy
                } else {
                    Move::Substitute
                };
                count += 1;
            }
        }
        if cell.target < target_len {
            moves[count] = Move::Insert;
            count += 1;
        }

        for &mv in &moves[..count] {
            let (next, step) = match mv {
                Move::Finish => (
                    Cell {
                        source: source_len,
                        target: target_len,
                        stopped_at: Some((cell.source, cell.target)),
                    },
                    costs.finish + costs.pad * (target_len - cell.target) as f64,
                ),
                Move::Delete => (
                    Cell {
                        source: cell.source + 1,
                        ..cell
                    },
                    costs.edit,
                ),
                Move::Copy => (
                    Cell {
                        source: cell.source + 1,
                        target: cell.target + 1,
                        ..cell
                    },
                    costs.copy,
                ),
                Move::Substitute => (
                    Cell {
                        source: cell.source + 1,
                        target: cell.target + 1,
                        ..cell
                    },
                    costs.edit,
                ),
                Move::Insert => (
                    Cell {
                        target: cell.target + 1,
                        ..cell
                    },
                    costs.edit,
                ),
            };

            if next.stopped_at.is_none() && next.drift() > BANDWIDTH {
                continue;
            }

            let next_cost = cost + step;
            if best.get(&next).map_or(true, |&known| next_cost < known) {
                best.insert(next, next_cost);
                queue.push(Reverse((OrderedFloat(next_cost), next)));
            }
        }
    }

    // The finish move is always available, so the queue never drains first
    SearchOutcome {
        source_end: 0,
        target_end: 0,
        cost: f64::INFINITY,
        explored,
        max_drift,
    }
}

/// Align one edge of a span.
///
/// `source_context` and `target_context` are the texts outside the span on
/// the given side, in document order. For a left edge they end at the span
/// and are read backwards. Only the parts the best alignment actually used
/// are returned; unmatched trailing context is left out.
pub fn align_edge(source_context: &str, target_context: &str, side: Side) -> AlignedEdge {
    let mut source: Vec<char> = source_context.chars().collect();
    let mut target: Vec<char> = target_context.chars().collect();

    if source.is_empty() || target.is_empty() {
        return AlignedEdge::default();
    }

    if side == Side::Left {
        source.reverse();
        target.reverse();
    }

    let outcome = search_boundary(&source, &target);
    let mut source = source[..outcome.source_end].to_vec();
    let mut target = target[..outcome.target_end].to_vec();

    if side == Side::Left {
        source.reverse();
        target.reverse();
    }

    AlignedEdge {
        source: source.into_iter().collect(),
        target: target.into_iter().collect(),
    }
}
