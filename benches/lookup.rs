//! Performance benchmarks for piscan
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use piscan::index::{build_index, BuildOptions};
use piscan::PiSearch;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CORPUS_DIGITS: usize = 2_000_000;

/// Pseudo-random digits from a fixed LCG seed, so runs are comparable
fn synthetic_digits(len: usize) -> String {
    let mut state: u64 = 0x3141_5926_5358_9793;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (b'0' + ((state >> 33) % 10) as u8) as char
        })
        .collect()
}

/// Create a corpus file and an index with key width `prefix_len`
fn create_benchmark_fixtures(prefix_len: usize) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let corpus = temp_dir.path().join("pi-digits");
    fs::write(&corpus, synthetic_digits(CORPUS_DIGITS)).expect("Failed to write corpus");

    let index_dir = temp_dir.path().join("index");
    let options = BuildOptions {
        prefix_len,
        parallel_shards: 0,
        silent: true,
    };
    build_index(&corpus, &index_dir, &options).expect("Failed to build index");

    (temp_dir, corpus, index_dir)
}

fn bench_build(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let corpus = temp_dir.path().join("pi-digits");
    fs::write(&corpus, synthetic_digits(CORPUS_DIGITS)).expect("Failed to write corpus");

    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for prefix_len in [3, 5, 7] {
        group.bench_with_input(BenchmarkId::from_parameter(prefix_len), &prefix_len, |b, &k| {
            let options = BuildOptions {
                prefix_len: k,
                parallel_shards: 0,
                silent: true,
            };
            let index_dir = temp_dir.path().join(format!("index-{}", k));
            b.iter(|| build_index(&corpus, &index_dir, &options).expect("build failed"))
        });
    }

    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let (_temp_dir, corpus, index_dir) = create_benchmark_fixtures(5);
    let search = PiSearch::open(&corpus, &index_dir).expect("Failed to open index");

    let digits = search.range(1_000_000, 1_000_012).expect("range failed");
    let queries = vec![
        ("short_2", digits[..2].to_string()),
        ("key_5", digits[..5].to_string()),
        ("long_12", digits.clone()),
        ("absent_12", "000000000000".to_string()),
    ];

    let mut group = c.benchmark_group("find");
    for (name, query) in &queries {
        group.bench_with_input(BenchmarkId::new("indexed", name), query, |b, q| {
            b.iter(|| search.find(black_box(q)).expect("find failed"))
        });
        group.bench_with_input(BenchmarkId::new("scan", name), query, |b, q| {
            b.iter(|| search.corpus().scan_first(black_box(q.as_bytes()), 0))
        });
    }
    group.finish();
}

fn bench_range(c: &mut Criterion) {
    let (_temp_dir, corpus, index_dir) = create_benchmark_fixtures(3);
    let search = PiSearch::open(&corpus, &index_dir).expect("Failed to open index");

    c.bench_function("range_100k", |b| {
        b.iter(|| search.range(black_box(500_000), black_box(600_000)).expect("range failed"))
    });
}

criterion_group!(benches, bench_build, bench_find, bench_range);
criterion_main!(benches);
