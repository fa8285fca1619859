//! Benchmarks for title parsing and fuzzy matching.
//!
//! Run with: cargo bench --bench matcher

use std::hint::black_box;
use std::path::PathBuf;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use manga_organizer::organize::{
    DEFAULT_AUTO_SCORE, DEFAULT_MIN_PARTIAL_CHARS, DEFAULT_MIN_SCORE, Matcher, SeriesFolder, TitleParser,
    normalize_title,
};

const TITLES: &[&str] = &[
    "One Piece",
    "Naruto",
    "Bleach",
    "Hunter x Hunter",
    "ジョジョの奇妙な冒険",
    "てすとフォルダ1",
    "Fullmetal Alchemist",
    "Dr. STONE",
];

/// Library with `size` series folders named after the sample titles.
fn library(size: usize) -> Vec<SeriesFolder> {
    (0..size)
        .map(|i| {
            let title = format!("{} {}", TITLES[i % TITLES.len()], i / TITLES.len());
            SeriesFolder::new(PathBuf::from("/library").join(&title), title)
        })
        .collect()
}

fn bench_candidates(c: &mut Criterion) {
    let matcher = Matcher::new(DEFAULT_MIN_SCORE, DEFAULT_AUTO_SCORE, DEFAULT_MIN_PARTIAL_CHARS);
    let mut group = c.benchmark_group("matcher_candidates");

    for size in [100, 1000, 5000] {
        let folders = library(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &folders, |b, folders| {
            b.iter(|| matcher.candidates(black_box("てすと"), black_box(folders)));
        });
    }

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let matcher = Matcher::new(DEFAULT_MIN_SCORE, DEFAULT_AUTO_SCORE, DEFAULT_MIN_PARTIAL_CHARS);
    c.bench_function("score_partial", |b| {
        b.iter(|| matcher.score(black_box("てすと"), black_box("てすとフォルダ1")));
    });
    c.bench_function("score_levenshtein", |b| {
        b.iter(|| matcher.score(black_box("fullmetalalchemist"), black_box("fullmetalalchemy")));
    });
}

fn bench_titles(c: &mut Criterion) {
    let parser = TitleParser::default();
    c.bench_function("split_archive_stem", |b| {
        b.iter(|| parser.split_archive_stem(black_box("Hunter x Hunter v12")));
    });
    c.bench_function("folder_title", |b| {
        b.iter(|| parser.folder_title(black_box("あ) [作者x作者2] てすとフォルダ1")));
    });
    c.bench_function("normalize_title", |b| {
        b.iter(|| normalize_title(black_box("ＯＮＥ　ＰＩＥＣＥ")));
    });
}

criterion_group!(benches, bench_candidates, bench_score, bench_titles);
criterion_main!(benches);
