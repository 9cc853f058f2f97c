use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use graveyard_hash::params::{DefaultParams, HighLoadParams, VeryHighLoadParams};
use graveyard_hash::GraveyardSet;

const INITIAL_KEYS: u64 = 50_000;
const HOVER_ROUNDS: u64 = 200;
const HOVER_BATCH: u64 = 100;

/// A hovering workload: insert/erase paired so `len` stays near a fixed
/// target, which is exactly the regime graveyard tombstones are meant to
/// keep cheap.
fn hover<P: graveyard_hash::params::GraveyardParams>(set: &mut GraveyardSet<u64, P>) {
    let mut next_key = INITIAL_KEYS;
    for round in 0..HOVER_ROUNDS {
        let base = round * HOVER_BATCH;
        for i in 0..HOVER_BATCH {
            set.remove(&(base + i));
        }
        for _ in 0..HOVER_BATCH {
            set.insert(next_key);
            next_key += 1;
        }
    }
}

fn hovering(c: &mut Criterion) {
    let mut group = c.benchmark_group("hovering");
    group.throughput(Throughput::Elements(HOVER_ROUNDS * HOVER_BATCH * 2));

    macro_rules! bench_profile {
        ($name:expr, $params:ty) => {
            group.bench_function(BenchmarkId::new("profile", $name), |b| {
                b.iter(|| {
                    let mut set: GraveyardSet<u64, $params> = GraveyardSet::new();
                    for k in 0..INITIAL_KEYS {
                        set.insert(k);
                    }
                    hover(&mut set);
                    black_box(set.probe_statistics().mean());
                })
            });
        };
    }

    bench_profile!("default_no_tombstones", DefaultParams);
    bench_profile!("high_load_with_tombstones", HighLoadParams);
    bench_profile!("very_high_load_with_tombstones", VeryHighLoadParams);

    group.finish();
}

criterion_group!(benches, hovering);
criterion_main!(benches);
