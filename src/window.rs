//! Context windows around decoded spans.
//!
//! Each span gets a bounded window on both sides in which the boundary
//! aligner may extend it. Target windows stop at the neighbouring spans;
//! source windows mirror the target expansion with a small extra margin on
//! the left and double the reach on the right.

use crate::models::{Span, SpanEdge};

/// Extra source characters allowed on the left beyond the target shrinkage.
const SOURCE_LEFT_MARGIN: usize = 10;

/// Compute context windows for the ordered spans of one target document.
///
/// Right-hand windows are not clamped to the document length here; callers
/// clamp when they fetch text.
pub fn expand_span_edges(spans: &[Span], max_gap: usize) -> Vec<SpanEdge> {
    spans
        .iter()
        .enumerate()
        .map(|(i, span)| {
            let prev_end = if i > 0 { spans[i - 1].target_end } else { 0 };
            let left_target = prev_end.max(span.target_begin.saturating_sub(max_gap));

            let next_begin = spans
                .get(i + 1)
                .map(|next| next.target_begin)
                .unwrap_or(span.target_end + max_gap);
            let right_target = next_begin.min(span.target_end + max_gap);

            let left_reach = span.target_begin.saturating_sub(left_target) + SOURCE_LEFT_MARGIN;
            let left_source = span.source_begin.saturating_sub(left_reach);
            let right_source =
                span.source_end + 2 * right_target.saturating_sub(span.target_end);

            SpanEdge {
                span: *span,
                left_context_target: left_target,
                right_context_target: right_target,
                left_context_source: left_source,
                right_context_source: right_source,
            }
        })
        .collect()
}

/// Clamp a window to a document of `len` characters.
#[inline]
pub fn clamp_range(begin: usize, end: usize, len: usize) -> (usize, usize) {
    let end = end.min(len);
    (begin.min(end), end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocId;

    fn span(target_begin: usize, target_end: usize, source_begin: usize, source_end: usize) -> Span {
        Span {
            source_id: DocId(1),
            target_begin,
            target_end,
            source_begin,
            source_end,
        }
    }

    #[test]
    fn test_empty_spans() {
        assert!(expand_span_edges(&[], 200).is_empty());
    }

    #[test]
    fn test_single_span_uses_max_gap() {
        let edges = expand_span_edges(&[span(500, 600, 1000, 1100)], 200);
        let edge = &edges[0];

        assert_eq!(edge.left_context_target, 300);
        assert_eq!(edge.right_context_target, 800);
        // 200 target characters mirrored plus the margin
        assert_eq!(edge.left_context_source, 790);
        // Twice the target expansion
        assert_eq!(edge.right_context_source, 1500);
    }

    #[test]
    fn test_left_window_stops_at_document_start() {
        let edges = expand_span_edges(&[span(50, 120, 5, 80)], 200);
        assert_eq!(edges[0].left_context_target, 0);
        assert_eq!(edges[0].left_context_source, 0);
    }

    #[test]
    fn test_neighbours_bound_windows() {
        let spans = [span(100, 200, 0, 100), span(260, 400, 500, 640)];
        let edges = expand_span_edges(&spans, 200);

        assert_eq!(edges[0].right_context_target, 260);
        assert_eq!(edges[1].left_context_target, 200);
        assert_eq!(edges[0].right_context_source, 100 + 2 * 60);
        assert_eq!(edges[1].left_context_source, 500 - (60 + 10));
    }

    #[test]
    fn test_containment() {
        let spans = [
            span(10, 90, 0, 80),
            span(95, 300, 400, 600),
            span(1000, 1100, 50, 150),
        ];
        let edges = expand_span_edges(&spans, 200);

        for (i, edge) in edges.iter().enumerate() {
            let s = edge.span;
            assert!(edge.left_context_target <= s.target_begin);
            assert!(s.target_begin <= s.target_end);
            assert!(s.target_end <= edge.right_context_target);
            assert!(edge.right_context_target - s.target_end <= 200);
            assert!(s.target_begin - edge.left_context_target <= 200);
            if i > 0 {
                assert!(edge.left_context_target >= spans[i - 1].target_end);
            }
            if i + 1 < spans.len() {
                assert!(edge.right_context_target <= spans[i + 1].target_begin);
            }
        }
    }

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(10, 50, 100), (10, 50));
        assert_eq!(clamp_range(10, 500, 100), (10, 100));
        assert_eq!(clamp_range(150, 500, 100), (100, 100));
    }
}
