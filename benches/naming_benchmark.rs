use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashSet;

use shutterstamp::naming::{resolve_dir_name, resolve_file_name, FilenameGenerator, Timeshift, DEFAULT_TEMPLATE};

fn benchmark_generate_filename(c: &mut Criterion) {
    let timestamp = NaiveDate::from_ymd_opt(2016, 10, 31)
        .and_then(|d| d.and_hms_opt(21, 4, 57))
        .expect("valid timestamp");
    let generator = FilenameGenerator::new(DEFAULT_TEMPLATE, Timeshift::seconds(1), true);

    c.bench_function("generate_filename", |b| {
        b.iter(|| generator.generate_filename(black_box(timestamp), black_box("JPG")))
    });
}

fn benchmark_collisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_collisions");

    for taken in [0usize, 10, 100, 1000] {
        let mut files: HashSet<String> = (1..taken).map(|i| format!("a-{}.jpg", i)).collect();
        let mut dirs: HashSet<String> = (1..taken).map(|i| format!("windmill ({})", i)).collect();
        if taken > 0 {
            files.insert("a.jpg".to_string());
            dirs.insert("windmill".to_string());
        }

        group.bench_with_input(BenchmarkId::new("file", taken), &files, |b, files| {
            b.iter(|| resolve_file_name(black_box("a.jpg"), |n| files.contains(n)))
        });
        group.bench_with_input(BenchmarkId::new("directory", taken), &dirs, |b, dirs| {
            b.iter(|| resolve_dir_name(black_box("windmill"), |n| dirs.contains(n)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_generate_filename, benchmark_collisions);
criterion_main!(benches);
