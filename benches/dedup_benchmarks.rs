use criterion::{black_box, criterion_group, criterion_main, Criterion};
use picgrab::duplicates::Deduplicator;
use picgrab::scanner::{Hasher, Walker};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// Fill `dir` with `count` files of `size` bytes, every `dup_every`-th one a copy of file 0.
fn populate(dir: &Path, count: usize, size: usize, dup_every: usize) {
    let base = vec![0xAB_u8; size];
    for i in 0..count {
        let path = dir.join(format!("{:010}.jpg", i));
        if i > 0 && i % dup_every == 0 {
            fs::write(path, &base).expect("Failed to write file");
        } else {
            let mut content = base.clone();
            content[..8].copy_from_slice(&(i as u64).to_le_bytes());
            fs::write(path, content).expect("Failed to write file");
        }
    }
}

// 1. Hashing Benchmarks
fn bench_hasher(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("large.jpg");
    fs::write(&path, vec![0x5A_u8; 4 * 1024 * 1024]).unwrap();
    let hasher = Hasher::new();

    c.bench_function("digest_4mb", |b| {
        b.iter(|| black_box(hasher.digest(&path).unwrap()))
    });
}

// 2. Directory Listing Benchmarks
fn bench_walker(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 400, 64, 3);

    c.bench_function("walker_400_files", |b| {
        b.iter(|| black_box(Walker::new(temp_dir.path()).files().unwrap()))
    });
}

// 3. Detection Benchmarks (no removal, so the directory stays intact)
fn bench_find_duplicates(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 400, 64 * 1024, 3);
    let dedup = Deduplicator::with_defaults();

    c.bench_function("find_duplicates_400x64k", |b| {
        b.iter(|| black_box(dedup.find_duplicates(temp_dir.path()).unwrap()))
    });
}

criterion_group!(benches, bench_hasher, bench_walker, bench_find_duplicates);
criterion_main!(benches);
