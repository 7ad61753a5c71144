//! Key store lookup cost.
//!
//! `load_by_digest` hashes directory entries until one matches. The direct
//! probe makes the common case constant; a renamed record forces the full
//! linear scan, which grows with the number of keys in the directory.
//!
//! Run with: `cargo bench --bench key_store_benchmark`

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keycrypt::KeyStore;

const PASSPHRASE: &str = "bench-passphrase";

fn bench_generate(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path());

    c.bench_function("key_store/generate", |b| {
        b.iter(|| store.generate(black_box(PASSPHRASE)).unwrap());
    });
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_store/load_by_digest");

    for count in [10usize, 100] {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        let digests: Vec<String> = (0..count)
            .map(|_| store.generate(PASSPHRASE).unwrap())
            .collect();

        let direct = digests[0].clone();
        group.bench_function(format!("direct_{count}"), |b| {
            b.iter(|| store.load_by_digest(black_box(&direct), PASSPHRASE).unwrap());
        });

        // Renaming breaks the direct probe without changing the digest.
        let scanned = digests[count - 1].clone();
        fs::rename(
            store.key_dir().join(&scanned),
            store.key_dir().join(format!("renamed-{count}")),
        )
        .unwrap();
        group.bench_function(format!("scan_{count}"), |b| {
            b.iter(|| store.load_by_digest(black_box(&scanned), PASSPHRASE).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_lookup);
criterion_main!(benches);
