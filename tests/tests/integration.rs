// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! End-to-end scenarios exercising the public `GraveyardSet`/`GraveyardMap`
//! API, as opposed to the crate's own inline unit tests which poke at
//! `RawTable` and the bucket/bitmask primitives directly.

use once_cell::sync::Lazy;

use graveyard_hash::params::{DefaultParams, HighLoadParams, VeryHighLoadParams};
use graveyard_hash::{GraveyardMap, GraveyardSet};

static LOGGER: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

fn init() {
    Lazy::force(&LOGGER);
}

#[test]
fn basic_set_scenario() {
    init();
    let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
    assert_eq!(set.insert(0), true);
    assert!(set.contains(&0));
    assert!(!set.contains(&1));
    assert_eq!(set.len(), 1);
    assert_eq!(set.insert(0), false);
    assert_eq!(set.len(), 1);
}

#[test]
fn iteration_covers_every_insert() {
    let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
    let keys = [7u64, 42, 100, 1u64 << 40, 1u64 << 63];
    for k in keys {
        set.insert(k);
    }
    let mut seen: Vec<u64> = set.iter().copied().collect();
    seen.sort_unstable();
    let mut expected = keys.to_vec();
    expected.sort_unstable();
    assert_eq!(seen, expected);
}

#[test]
fn map_try_emplace_scenario() {
    let mut map: GraveyardMap<u64, String, DefaultParams> = GraveyardMap::new();
    let (v, inserted) = map.try_emplace(5, "a".to_string());
    assert_eq!(v, "a");
    assert!(inserted);
    let (v, inserted) = map.try_emplace(5, "b".to_string());
    assert_eq!(v, "a");
    assert!(!inserted);
    assert_eq!(map.get(&5), Some(&"a".to_string()));
    assert_eq!(map.get_or_insert_default(5), &"a".to_string());
    assert_eq!(map.get_or_insert_default(6), &String::new());
    assert_eq!(map.len(), 2);
}

#[test]
fn rehash_preserves_contents_at_scale() {
    init();
    let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
    for i in 0..100_000u64 {
        set.insert(i);
    }
    let target_slots = (set.len() * 8 + 6) / 7;
    set.rehash(target_slots);
    assert_eq!(set.len(), 100_000);
    for i in 0..100_000u64 {
        assert!(set.contains(&i));
    }
}

#[test]
fn reserve_then_inserts_never_rehash_again() {
    let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
    set.reserve(10_000);
    let bucket_count = set.bucket_count();
    for i in 0..10_000u64 {
        set.insert(i);
    }
    assert_eq!(set.bucket_count(), bucket_count);
}

#[test]
fn hovering_workload_keeps_high_load_table_internally_consistent() {
    init();
    let mut set: GraveyardSet<u64, HighLoadParams> = GraveyardSet::new();
    for i in 0..20_000u64 {
        set.insert(i);
    }
    for round in 0..5 {
        for i in (round * 4000)..((round + 1) * 4000) {
            set.remove(&(i as u64));
        }
        for i in (20_000 + round * 4000)..(20_000 + (round + 1) * 4000) {
            set.insert(i as u64);
        }
    }
    set.validate().expect("hovering workload should preserve invariants");
}

#[test]
fn very_high_load_params_also_validate_after_hovering() {
    let mut set: GraveyardSet<u64, VeryHighLoadParams> = GraveyardSet::new();
    for i in 0..5000u64 {
        set.insert(i);
    }
    for i in 0..5000u64 {
        if i % 5 == 0 {
            set.remove(&i);
        }
    }
    for i in 5000..6000u64 {
        set.insert(i);
    }
    set.validate().expect("very-high-load table should stay consistent");
}

#[test]
fn empty_table_boundary_behavior() {
    let set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
    assert!(!set.contains(&0));
    assert_eq!(set.iter().count(), 0);
    assert_eq!(set.bucket_count(), 0);
    assert_eq!(set.allocated_memory_size(), 0);
}

#[test]
fn repeated_rehash_zero_is_idempotent_on_contents() {
    let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
    for i in 0..300u64 {
        set.insert(i);
    }
    set.rehash(0);
    set.rehash(0);
    assert_eq!(set.len(), 300);
    for i in 0..300u64 {
        assert!(set.contains(&i));
    }
}

#[test]
fn clone_produces_an_independent_copy() {
    let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
    for i in 0..50u64 {
        set.insert(i);
    }
    let mut cloned = set.clone();
    cloned.insert(999);
    assert!(!set.contains(&999));
    assert!(cloned.contains(&999));
    for i in 0..50u64 {
        assert!(set.contains(&i));
        assert!(cloned.contains(&i));
    }
}
