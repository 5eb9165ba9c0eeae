use batch_imagegen::{
    inventory::{image_file_name, parse_image_id, reconcile, scan_generated_counts},
    prompts::read_prompts,
};
use chrono::{Duration, Local, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::Path;
use tempfile::TempDir;

const CATEGORIES: usize = 10;
const IDS_PER_CATEGORY: usize = 20;

/// Populate `root` with `files_per_id` images for every category/ID pair
fn populate(root: &Path, files_per_id: usize) {
    let base = Local
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Local::now);

    for c in 0..CATEGORIES {
        let dir = root.join(format!("category{c}"));
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..IDS_PER_CATEGORY {
            let id = format!("P{i}");
            for n in 0..files_per_id {
                let timestamp = base + Duration::microseconds(n as i64);
                std::fs::write(dir.join(image_file_name(&id, &timestamp)), b"").unwrap();
            }
        }
        // Non-matching files are skipped by the scanner
        std::fs::write(dir.join("README.txt"), b"").unwrap();
    }
}

fn prompts_csv() -> String {
    let mut csv = String::from("Category,Prompt,ID,Count\n");
    for c in 0..CATEGORIES {
        for i in 0..IDS_PER_CATEGORY {
            csv.push_str(&format!("category{c},prompt {c} {i},P{i},25\n"));
        }
    }
    csv
}

fn benchmark_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_generated_counts");
    group.sample_size(20);

    for files_per_id in [1, 5, 20] {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path(), files_per_id);

        group.bench_with_input(
            BenchmarkId::from_parameter(CATEGORIES * IDS_PER_CATEGORY * files_per_id),
            &temp_dir,
            |b, dir| b.iter(|| scan_generated_counts(black_box(dir.path())).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_reconcile(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 5);
    let csv = prompts_csv();

    c.bench_function("load_and_reconcile", |b| {
        b.iter(|| {
            let mut rows = read_prompts(black_box(csv.as_bytes())).unwrap();
            let counts = scan_generated_counts(temp_dir.path()).unwrap();
            reconcile(&mut rows, &counts);
            rows
        });
    });
}

fn benchmark_parse_name(c: &mut Criterion) {
    let names = [
        "image_P12_20240101_000000.000001.png",
        "image_P12_final.png",
        "notes.txt",
    ];

    c.bench_function("parse_image_id", |b| {
        b.iter(|| {
            for name in &names {
                black_box(parse_image_id(black_box(name)));
            }
        });
    });
}

criterion_group!(benches, benchmark_scan, benchmark_reconcile, benchmark_parse_name);
criterion_main!(benches);
