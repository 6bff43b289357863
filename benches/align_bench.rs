//! Criterion benchmarks for boundary alignment, decoding and shingling.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use seriatim::align::align_edge;
use seriatim::models::{DocId, MatchGroup, ReuseParams, Side, SourceMatch};

/// Deterministic lowercase text with word breaks.
fn synthetic_text(len: usize, seed: u64) -> String {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            if (state >> 60) < 3 {
                ' '
            } else {
                (b'a' + ((state >> 33) % 26) as u8) as char
            }
        })
        .collect()
}

fn bench_alignment(c: &mut Criterion) {
    let sizes = [50, 200, 400];

    let mut group = c.benchmark_group("boundary_search");

    for size in sizes {
        let shared = synthetic_text(size, 7);

        // Identical contexts (alignment runs to the end)
        group.bench_with_input(BenchmarkId::new("identical", size), &size, |b, _| {
            b.iter(|| align_edge(black_box(&shared), black_box(&shared), Side::Right))
        });

        // Every tenth character substituted
        let edited: String = shared
            .chars()
            .enumerate()
            .map(|(i, c)| if i % 10 == 9 { '#' } else { c })
            .collect();

        group.bench_with_input(BenchmarkId::new("10pct_edits", size), &size, |b, _| {
            b.iter(|| align_edge(black_box(&shared), black_box(&edited), Side::Left))
        });

        // No match (search stops almost immediately)
        let unrelated = synthetic_text(size, 11);

        group.bench_with_input(BenchmarkId::new("no_match", size), &size, |b, _| {
            b.iter(|| align_edge(black_box(&shared), black_box(&unrelated), Side::Right))
        });
    }

    group.finish();
}

fn bench_decoding(c: &mut Criterion) {
    use seriatim::decode::decode_sources;

    let params = ReuseParams::default();

    let mut group = c.benchmark_group("decoding");

    let group_counts = [100, 1000, 10000];

    for count in group_counts {
        // Three sources competing for every target offset
        let groups: Vec<MatchGroup> = (0..count)
            .map(|i| MatchGroup {
                target_pos: 30 + i * 6,
                matches: (1..=3u64)
                    .map(|s| SourceMatch {
                        source_id: DocId(s),
                        source_pos: (s as usize) * 1000 + i * 6,
                    })
                    .collect(),
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("three_sources", count), &count, |b, _| {
            b.iter(|| decode_sources(black_box(&groups), &params))
        });
    }

    group.finish();
}

fn bench_shingling(c: &mut Criterion) {
    use seriatim::extract::unique_postings;

    let mut group = c.benchmark_group("shingling");

    let sizes = [1000, 10000, 100000];

    for size in sizes {
        let text = synthetic_text(size, 3);

        group.bench_with_input(BenchmarkId::new("anchored", size), &size, |b, _| {
            b.iter(|| unique_postings(black_box(&text), 20, false))
        });

        group.bench_with_input(BenchmarkId::new("floating", size), &size, |b, _| {
            b.iter(|| unique_postings(black_box(&text), 20, true))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    use seriatim::compare::detect_reuse;
    use seriatim::models::Document;

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    let passage = synthetic_text(2000, 5);
    let documents: Vec<Document> = (0..20)
        .map(|i| {
            let text = if i % 4 == 0 {
                format!("{} {} {}", synthetic_text(500, 100 + i), passage, synthetic_text(500, 200 + i))
            } else {
                synthetic_text(3000, 300 + i)
            };
            Document::new(format!("doc-{}", i), text)
        })
        .collect();
    let params = ReuseParams::default();

    group.bench_function("detect_20_docs", |b| {
        b.iter(|| detect_reuse(black_box(&documents), &params, false))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_alignment,
    bench_decoding,
    bench_shingling,
    bench_pipeline
);
criterion_main!(benches);
