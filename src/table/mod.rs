// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! The open-addressed bucket array: SIMD-matched control bytes, graveyard
//! tombstone seeding, and the probing loop that everything else in this
//! crate sits on top of.

mod bitmask;
mod bucket;
mod buckets;
mod holder;
mod mem;
mod raw;
mod stats;

pub(crate) use bucket::Bucket;
pub(crate) use buckets::Buckets;
pub(crate) use holder::Holder;
pub(crate) use raw::{RawIter, RawIterMut, RawTable};
pub use stats::ProbeStatistics;

use core::hash::{BuildHasher, Hash, Hasher};

/// Hashes `val` with the hasher built by `hash_builder`. Shared by the
/// set and map façades so both compute hashes identically.
#[inline]
pub(crate) fn make_hash<K: Hash + ?Sized>(hash_builder: &impl BuildHasher, val: &K) -> u64 {
    let mut state = hash_builder.build_hasher();
    val.hash(&mut state);
    state.finish()
}

/// Number of slots in a bucket.
pub(crate) const SLOTS_PER_BUCKET: usize = 14;

/// Bytes read by one `Group::load`: 14 control bytes + the search-distance
/// byte. The loader is allowed to read one byte past this (see
/// `Bucket::ctrl`'s extra pad byte) to keep the SIMD load a clean 16 bytes.
pub(crate) const CTRL_BYTES: usize = SLOTS_PER_BUCKET + 1;

/// Sentinel control byte marking a slot empty. The only control value
/// with bit 7 set, which the SSE2 path exploits in `match_empty`.
pub(crate) const EMPTY: u8 = 255;

/// H2 values are taken modulo this, keeping them in `0..128` so `EMPTY`
/// (255) can never collide with a real tag.
pub(crate) const H2_MODULO: u64 = 128;

/// `search_distance` value marking the last physical bucket, so the probe
/// loop has a place to stop without wrapping around.
pub(crate) const SEARCH_DISTANCE_END_SENTINEL: u8 = 255;

cfg_if::cfg_if! {
    if #[cfg(all(
        target_feature = "sse2",
        any(target_arch = "x86", target_arch = "x86_64"),
        not(miri)
    ))] {
        mod sse2;
        pub(crate) use sse2 as imp;
    } else {
        #[path = "generic.rs"]
        mod generic;
        pub(crate) use generic as imp;
    }
}

/// Splits a 64-bit hash into its H1 (preferred bucket) and H2 (control
/// byte tag) components, per the bucket-count-dependent H1.
///
/// `h1` is computed as `(hash * logical_size) >> 64`, a Lemire-style
/// fixed-point multiply that maps the hash uniformly onto `0..logical_size`
/// without a division.
#[inline]
pub(crate) fn h1(hash: u64, logical_size: usize) -> usize {
    (((hash as u128) * (logical_size as u128)) >> 64) as usize
}

#[inline]
pub(crate) fn h2(hash: u64) -> u8 {
    (hash % H2_MODULO) as u8
}

/// Number of extra physical buckets appended after the logical `L` buckets
/// so that a probe starting near the end of the logical range never needs
/// to wrap around. See `overflow` in the design notes for the derivation
/// of these thresholds.
#[inline]
pub(crate) fn overflow(logical_size: usize) -> usize {
    match logical_size {
        0 => 0,
        1 | 2 => 1,
        3..=5 => logical_size - 1,
        _ => 5,
    }
}

#[inline]
pub(crate) fn physical_size(logical_size: usize) -> usize {
    logical_size + overflow(logical_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_matches_thresholds() {
        assert_eq!(overflow(0), 0);
        assert_eq!(overflow(1), 1);
        assert_eq!(overflow(2), 1);
        assert_eq!(overflow(3), 2);
        assert_eq!(overflow(4), 3);
        assert_eq!(overflow(5), 4);
        assert_eq!(overflow(6), 5);
        assert_eq!(overflow(1000), 5);
    }

    #[test]
    fn h1_is_in_range() {
        for logical_size in [1usize, 7, 128, 9973] {
            for hash in [0u64, 1, u64::MAX, 0xdead_beef_cafe_f00d] {
                assert!(h1(hash, logical_size) < logical_size);
            }
        }
    }

    #[test]
    fn h2_is_below_modulo() {
        for hash in [0u64, 1, u64::MAX, 0xdead_beef_cafe_f00d] {
            assert!((h2(hash) as u64) < H2_MODULO);
        }
    }
}
