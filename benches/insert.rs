use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

use graveyard_hash::params::{DefaultParams, HighLoadParams, VeryHighLoadParams};
use graveyard_hash::GraveyardSet;

const TOTAL_KEYS: u64 = 100_000;

fn random_keys(n: u64) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.gen()).collect()
}

fn insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(TOTAL_KEYS));

    let keys = random_keys(TOTAL_KEYS);

    group.bench_function(BenchmarkId::new("profile", "default"), |b| {
        b.iter(|| {
            let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
            for &k in &keys {
                set.insert(k);
            }
            set
        })
    });

    group.bench_function(BenchmarkId::new("profile", "high_load"), |b| {
        b.iter(|| {
            let mut set: GraveyardSet<u64, HighLoadParams> = GraveyardSet::new();
            for &k in &keys {
                set.insert(k);
            }
            set
        })
    });

    group.bench_function(BenchmarkId::new("profile", "very_high_load"), |b| {
        b.iter(|| {
            let mut set: GraveyardSet<u64, VeryHighLoadParams> = GraveyardSet::new();
            for &k in &keys {
                set.insert(k);
            }
            set
        })
    });

    group.finish();
}

criterion_group!(benches, insert);
criterion_main!(benches);
