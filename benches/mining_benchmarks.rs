//! Performance benchmarks for mining operations

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pow_miner::crypto::sha256;
use pow_miner::{
    BlockFields, CpuWorker, Difficulty, Nonce, Payload, SearchConfig, SequentialWorker, Threshold,
};
use std::hint::black_box;

fn sample_payload(difficulty: Difficulty) -> Payload {
    Payload::for_block(&BlockFields::new([0x42u8; 32], [0x17u8; 32], 1_700_000_000), difficulty)
}

fn bench_hash_computation(c: &mut Criterion) {
    let payload = sample_payload(Difficulty::default());

    c.bench_function("sha256_payload", |b| {
        b.iter(|| {
            black_box(sha256(black_box(payload.as_bytes())));
        });
    });
}

fn bench_nonce_operations(c: &mut Criterion) {
    let mut payload = sample_payload(Difficulty::default());

    c.bench_function("set_nonce", |b| {
        b.iter(|| {
            payload.set_nonce(black_box(Nonce::new(12_345_678)));
        });
    });
}

fn bench_threshold_check(c: &mut Criterion) {
    let threshold = Threshold::new(Difficulty::new(24).unwrap());
    let digest = sha256(b"threshold");

    c.bench_function("threshold_is_met_by", |b| {
        b.iter(|| {
            black_box(threshold.is_met_by(black_box(&digest)));
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let difficulty = Difficulty::new(14).unwrap();
    let payload = sample_payload(difficulty);
    let threshold = Threshold::new(difficulty);

    group.bench_function("sequential", |b| {
        b.iter(|| {
            let mut worker = SequentialWorker::new();
            black_box(worker.search(&payload, &threshold).unwrap());
        });
    });

    for workers in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("parallel", workers), &workers, |b, &workers| {
            let worker = CpuWorker::new(SearchConfig::new(workers));
            b.iter(|| {
                black_box(worker.search(&payload, &threshold).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hash_computation,
    bench_nonce_operations,
    bench_threshold_check,
    bench_search
);
criterion_main!(benches);
