// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! The probing engine: everything above this (`GraveyardSet`,
//! `GraveyardMap`) owns a hasher and an equality function and hands this
//! layer a precomputed hash plus an `Eq`-shaped closure. `RawTable` itself
//! knows nothing about keys, only about control bytes, slots, and buckets.

use core::marker::PhantomData;
use core::mem::size_of;

use crate::config::PageReleaseConfig;
use crate::error::{Result, ValidationError};
use crate::params::GraveyardParams;
use crate::table::bucket::Bucket;
use crate::table::buckets::Buckets;
use crate::table::mem::PageReleaseTracker;
use crate::table::stats::ProbeStatistics;
use crate::table::{h1, h2, physical_size, SLOTS_PER_BUCKET};

pub(crate) struct RawTable<T, P> {
    buckets: Buckets<T>,
    logical_size: usize,
    len: usize,
    _params: PhantomData<P>,
}

impl<T, P: GraveyardParams> RawTable<T, P> {
    pub(crate) fn new() -> Self {
        RawTable {
            buckets: Buckets::allocate(0),
            logical_size: 0,
            len: 0,
            _params: PhantomData,
        }
    }

    pub(crate) fn with_logical_size(logical_size: usize) -> Self {
        if logical_size == 0 {
            return Self::new();
        }
        RawTable {
            buckets: Buckets::allocate(physical_size(logical_size)),
            logical_size,
            len: 0,
            _params: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn logical_size(&self) -> usize {
        self.logical_size
    }

    #[inline]
    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.physical_len()
    }

    #[inline]
    pub(crate) fn allocated_memory_size(&self) -> usize {
        self.buckets.allocated_bytes()
    }

    /// Total slot capacity of the current allocation: `bucket_count() *
    /// SLOTS_PER_BUCKET`. Matches the reference table's `capacity() ==
    /// bucket_count()` convention, which counts raw slots rather than the
    /// load-factor-limited element count.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.physical_len() * SLOTS_PER_BUCKET
    }

    /// Largest `len` this table can hold before the next insert forces a
    /// rehash: `L * 14 * full_num / full_den`.
    fn full_threshold(logical_size: usize) -> usize {
        logical_size * SLOTS_PER_BUCKET * P::FULL_NUM / P::FULL_DEN
    }

    /// `len` a rehash targets for its new logical size: `L * 14 *
    /// rehashed_num / rehashed_den`.
    fn rehashed_target(logical_size: usize) -> usize {
        logical_size * SLOTS_PER_BUCKET * P::REHASHED_NUM / P::REHASHED_DEN
    }

    /// True iff `target` elements would exceed the current ceiling load
    /// factor, i.e. `L * 14 * full_num < target * full_den`.
    fn needs_rehash(&self, target: usize) -> bool {
        self.logical_size * SLOTS_PER_BUCKET * P::FULL_NUM < target * P::FULL_DEN
    }

    /// Smallest logical size whose `rehashed_target` is at least `target`.
    fn logical_size_for_rehashed_target(target: usize) -> usize {
        if target == 0 {
            return 0;
        }
        // target <= L * 14 * rehashed_num / rehashed_den
        // L >= ceil(target * rehashed_den / (14 * rehashed_num))
        let numerator = target * P::REHASHED_DEN;
        let denominator = SLOTS_PER_BUCKET * P::REHASHED_NUM;
        (numerator + denominator - 1) / denominator
    }

    /// Smallest logical size whose `full_threshold` is at least `target`.
    fn logical_size_for_full_threshold(target: usize) -> usize {
        if target == 0 {
            return 0;
        }
        let numerator = target * P::FULL_DEN;
        let denominator = SLOTS_PER_BUCKET * P::FULL_NUM;
        (numerator + denominator - 1) / denominator
    }

    /// Period, in slots, between graveyard tombstone seeds placed by a
    /// rehash. `None` when the params disable seeding.
    fn tombstone_period() -> Option<usize> {
        P::TOMBSTONE_RATIO.map(|(a, b)| {
            (SLOTS_PER_BUCKET * b + a - 1) / a
        })
    }

    /// If bucket `bucket_idx`'s 14-slot span contains the next periodic
    /// tombstone position (one withheld slot per `period` slots, counted
    /// across the whole array), returns that slot's offset within the
    /// bucket. `None` means this bucket hosts no tombstone.
    fn tombstone_slot_in_bucket(period: usize, bucket_idx: usize) -> Option<usize> {
        let bucket_start = bucket_idx * SLOTS_PER_BUCKET;
        let next_multiple = ((bucket_start + period - 1) / period) * period;
        let offset = next_multiple - bucket_start;
        if offset < SLOTS_PER_BUCKET {
            Some(offset)
        } else {
            None
        }
    }

    /// Finds the bucket/slot holding a key matching `eq`, given its hash.
    pub(crate) fn find(&self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Option<(usize, usize)> {
        if self.logical_size == 0 {
            return None;
        }
        let start = h1(hash, self.logical_size);
        let needle = h2(hash);
        let raw_distance = self.buckets.bucket(start).search_distance();
        let mut remaining = if self.buckets.bucket(start).is_end_sentinel() {
            0
        } else {
            raw_distance as usize
        };
        let mut bucket_idx = start;
        loop {
            let bucket = self.buckets.bucket(bucket_idx);
            let slot = bucket.find_key(needle, &mut eq);
            if crate::hint::likely(slot != SLOTS_PER_BUCKET) {
                return Some((bucket_idx, slot));
            }
            if remaining == 0 || bucket_idx + 1 >= self.buckets.physical_len() {
                return None;
            }
            bucket_idx += 1;
            remaining -= 1;
        }
    }

    pub(crate) fn get(&self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<&T> {
        let (bucket_idx, slot) = self.find(hash, eq)?;
        // Safety: `find` only returns positions it confirmed occupied.
        Some(unsafe { self.buckets.bucket(bucket_idx).slot_ref(slot) })
    }

    pub(crate) fn get_mut(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<&mut T> {
        let (bucket_idx, slot) = self.find(hash, eq)?;
        // Safety: `find` only returns positions it confirmed occupied.
        Some(unsafe { self.buckets.bucket_mut(bucket_idx).slot_mut(slot) })
    }

    pub(crate) fn contains(&self, hash: u64, eq: impl FnMut(&T) -> bool) -> bool {
        self.find(hash, eq).is_some()
    }

    pub(crate) fn remove(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<T> {
        let (bucket_idx, slot) = self.find(hash, eq)?;
        Some(self.remove_at(bucket_idx, slot))
    }

    fn remove_at(&mut self, bucket_idx: usize, slot: usize) -> T {
        let bucket = self.buckets.bucket_mut(bucket_idx);
        // Safety: caller only passes positions that are occupied.
        let value = unsafe { bucket.read_slot(slot) };
        bucket.clear_slot(slot);
        self.len -= 1;
        value
    }

    /// Ensures there is room for `additional` more elements, rehashing
    /// first if the ceiling load factor would otherwise be crossed.
    ///
    /// Targets the *full* threshold (not the lower post-rehash target), and
    /// never grows the logical size by less than 1/7 even if the request
    /// would fit in a smaller table — preserved from the reference
    /// implementation's reserve path (see the design notes' open question
    /// on this).
    pub(crate) fn reserve(&mut self, additional: usize, hasher: impl Fn(&T) -> u64) {
        let needed = self.len + additional;
        if !self.needs_rehash(needed) {
            return;
        }
        let required = Self::logical_size_for_full_threshold(needed);
        let floor = (self.logical_size * 8 + 6) / 7;
        let new_logical_size = required.max(floor).max(1);
        log::trace!(
            "graveyard table reserve: len={} additional={} -> {} logical buckets",
            self.len,
            additional,
            new_logical_size
        );
        self.rehash_to(new_logical_size, hasher);
    }

    /// Inserts `value` without checking whether an equal key already
    /// exists; callers (`GraveyardSet`/`GraveyardMap`) must have already
    /// resolved that via `find`/`get`. Grows the table first, targeting the
    /// post-rehash load factor, if the insert would cross the ceiling.
    pub(crate) fn insert(&mut self, hash: u64, value: T, hasher: impl Fn(&T) -> u64) -> &mut T {
        if crate::hint::unlikely(self.needs_rehash(self.len + 1)) {
            let new_logical_size =
                Self::logical_size_for_rehashed_target(self.len + 1).max(self.logical_size + 1);
            self.rehash_to(new_logical_size, hasher);
        }
        let (bucket_idx, slot) = self.insert_no_grow(hash, value);
        // Safety: just written and marked occupied.
        unsafe { self.buckets.bucket_mut(bucket_idx).slot_mut(slot) }
    }

    /// Places `value` into the first empty slot reachable from its
    /// preferred bucket, extending that bucket's recorded search distance
    /// if this probe ran further than any previous one starting there.
    /// Assumes the table already has room (a rehash has run if needed).
    fn insert_no_grow(&mut self, hash: u64, value: T) -> (usize, usize) {
        self.insert_no_grow_seeding(hash, value, None)
    }

    /// As `insert_no_grow`, but when `tombstone_period` is set, a bucket
    /// hosting the next periodic tombstone position has that slot excluded
    /// from its candidate empty set, so the ascending placement pass used
    /// by a rehash leaves it genuinely empty instead of filling it with the
    /// next element that happens to probe through. Only a rehash's own
    /// re-insertion pass calls this with a tombstone period; ordinary
    /// runtime inserts use `insert_no_grow`, which is free to use any empty
    /// slot including ones a previous rehash withheld.
    fn insert_no_grow_seeding(
        &mut self,
        hash: u64,
        value: T,
        tombstone_period: Option<usize>,
    ) -> (usize, usize) {
        debug_assert!(self.logical_size > 0, "insert_no_grow called on a zero-capacity table");
        let start = h1(hash, self.logical_size);
        let needle = h2(hash);
        let last_physical = self.buckets.physical_len() - 1;
        let mut bucket_idx = start;
        let mut hops = 0usize;
        let slot = loop {
            let bucket = self.buckets.bucket_mut(bucket_idx);
            let mut empty = bucket.empty_mask();
            if let Some(period) = tombstone_period {
                if let Some(withheld) = Self::tombstone_slot_in_bucket(period, bucket_idx) {
                    empty = empty.without_bit(withheld);
                }
            }
            let slot = empty.lowest_set_bit();
            if crate::hint::likely(slot != SLOTS_PER_BUCKET) {
                break slot;
            }
            assert!(
                bucket_idx < last_physical,
                "graveyard table ran out of probing room; reserve() should have grown it first"
            );
            bucket_idx += 1;
            hops += 1;
        };
        {
            let bucket = self.buckets.bucket_mut(bucket_idx);
            // Safety: `slot` just came back from the (possibly tombstone-
            // masked) empty mask, so it is genuinely free.
            unsafe { bucket.write_slot(slot, value) };
            bucket.set_occupied(slot, needle);
        }
        // Unconditional (unlike a `hops > 0` guard): cheap to evaluate even
        // when hops == 0, and it keeps this in lockstep with the reference
        // table's `search_distance[p] = max(search_distance[p], i)` update,
        // which runs for every insert regardless of how far it probed.
        // `hops` counts buckets *beyond* the preferred one — `find` always
        // scans the preferred bucket first regardless of its recorded
        // search distance, so a `hops == 0` insert leaving the distance at
        // 0 is already exact, not an approximation.
        let start_bucket = self.buckets.bucket_mut(start);
        if !start_bucket.is_end_sentinel() && (start_bucket.search_distance() as usize) < hops {
            start_bucket.set_search_distance(hops as u8);
        }
        self.len += 1;
        (bucket_idx, slot)
    }

    /// Drops every live value and resets the table to empty, keeping the
    /// current allocation.
    pub(crate) fn clear(&mut self) {
        for idx in 0..self.buckets.physical_len() {
            let bucket = self.buckets.bucket_mut(idx);
            for slot in 0..SLOTS_PER_BUCKET {
                if bucket.is_occupied(slot) {
                    // Safety: slot confirmed occupied above.
                    drop(unsafe { bucket.read_slot(slot) });
                }
            }
            bucket.init();
        }
        if self.buckets.physical_len() > 0 {
            let last = self.buckets.physical_len() - 1;
            self.buckets.bucket_mut(last).set_end_sentinel();
        }
        self.len = 0;
    }

    /// Rehashes into a new array sized for `new_logical_size`, re-inserting
    /// every live element in ascending old-bucket order and, if the
    /// parameters enable it, seeding graveyard slack periodically so a
    /// future hovering (insert/erase) workload doesn't immediately force
    /// probe lengths to grow again.
    pub(crate) fn rehash_to(&mut self, new_logical_size: usize, hasher: impl Fn(&T) -> u64) {
        self.rehash_to_with_config(new_logical_size, hasher, &PageReleaseConfig::default())
    }

    pub(crate) fn rehash_to_with_config(
        &mut self,
        new_logical_size: usize,
        hasher: impl Fn(&T) -> u64,
        page_release: &PageReleaseConfig,
    ) {
        log::debug!(
            "graveyard table rehash: {} -> {} logical buckets (len={}, tombstones={})",
            self.logical_size,
            new_logical_size,
            self.len,
            P::TOMBSTONE_RATIO.is_some()
        );
        let new_physical = physical_size(new_logical_size);
        let mut new_table: RawTable<T, P> = RawTable {
            buckets: Buckets::allocate(new_physical),
            logical_size: new_logical_size,
            len: 0,
            _params: PhantomData,
        };

        let period = Self::tombstone_period();
        let bucket_stride = size_of::<Bucket<T>>();
        let mut tracker = PageReleaseTracker::new(page_release.period_buckets, bucket_stride);

        for old_idx in 0..self.buckets.physical_len() {
            let old_bucket = self.buckets.bucket_mut(old_idx);
            for slot in 0..SLOTS_PER_BUCKET {
                if old_bucket.is_occupied(slot) {
                    // Safety: slot confirmed occupied above.
                    let value = unsafe { old_bucket.read_slot(slot) };
                    old_bucket.clear_slot(slot);
                    let hash = hasher(&value);
                    new_table.insert_no_grow_seeding(hash, value, period);
                }
            }
            // Safety: old_bucket has not been freed; its memory remains
            // valid until `self.buckets` is replaced below.
            let drained_ptr = old_bucket as *const Bucket<T> as *const u8;
            tracker.advance(drained_ptr);
        }

        self.buckets = new_table.buckets;
        self.logical_size = new_table.logical_size;
        // `self.len` is unchanged: rehashing moves elements, it never
        // creates or destroys them.
        debug_assert_eq!(self.len, new_table.len);
    }

    /// Rebuilds the table with a new logical bucket count of
    /// `ceil(slot_count / 14)`. `slot_count == 0` rehashes to the minimum
    /// size that still fits the current contents at the full-load
    /// threshold.
    pub(crate) fn rehash(&mut self, slot_count: usize, hasher: impl Fn(&T) -> u64) {
        let new_logical_size = if slot_count == 0 {
            Self::logical_size_for_full_threshold(self.len).max(1)
        } else {
            (slot_count + SLOTS_PER_BUCKET - 1) / SLOTS_PER_BUCKET
        };
        self.rehash_to(new_logical_size, hasher);
    }

    /// Copies every live element into a freshly sized table without ever
    /// seeding tombstones, for use by `Clone`.
    pub(crate) fn copy_from(&self, hasher: impl Fn(&T) -> u64) -> Self
    where
        T: Clone,
    {
        let mut copy: RawTable<T, P> = RawTable::with_logical_size(self.logical_size);
        for idx in 0..self.buckets.physical_len() {
            let bucket = self.buckets.bucket(idx);
            for slot in 0..SLOTS_PER_BUCKET {
                if bucket.is_occupied(slot) {
                    // Safety: slot confirmed occupied above.
                    let value = unsafe { bucket.slot_ref(slot) }.clone();
                    let hash = hasher(&value);
                    copy.insert_no_grow(hash, value);
                }
            }
        }
        copy
    }

    pub(crate) fn iter(&self) -> RawIter<'_, T> {
        RawIter {
            buckets: &self.buckets,
            bucket_idx: 0,
            slot: 0,
            remaining: self.len,
        }
    }

    pub(crate) fn iter_mut(&mut self) -> RawIterMut<'_, T> {
        RawIterMut {
            buckets: &mut self.buckets,
            bucket_idx: 0,
            slot: 0,
            remaining: self.len,
        }
    }

    /// Full-table consistency check: recomputes occupancy counts and, for
    /// every live element, verifies it is reachable from its preferred
    /// bucket within that bucket's recorded search distance.
    pub(crate) fn validate(&self, hasher: impl Fn(&T) -> u64) -> Result<()> {
        let mut counted = 0usize;
        let mut any_slack = false;
        for preferred in 0..self.buckets.physical_len().min(self.logical_size) {
            let start_bucket = self.buckets.bucket(preferred);
            if start_bucket.find_first_empty() != SLOTS_PER_BUCKET {
                any_slack = true;
            }
        }

        for idx in 0..self.buckets.physical_len() {
            let bucket = self.buckets.bucket(idx);
            for slot in 0..SLOTS_PER_BUCKET {
                if !bucket.is_occupied(slot) {
                    continue;
                }
                counted += 1;
                // Safety: slot confirmed occupied above.
                let hash = hasher(unsafe { bucket.slot_ref(slot) });
                let preferred = h1(hash, self.logical_size);
                if idx < preferred {
                    return Err(ValidationError::MisplacedSlot {
                        bucket: idx,
                        slot,
                        preferred,
                    });
                }
                let needed = idx - preferred;
                let start_bucket = self.buckets.bucket(preferred);
                let recorded = if start_bucket.is_end_sentinel() {
                    0
                } else {
                    start_bucket.search_distance() as usize
                };
                if needed > recorded {
                    return Err(ValidationError::SearchDistanceOverflow {
                        bucket: preferred,
                        recorded: recorded as u8,
                        needed,
                    });
                }
            }
        }

        if counted != self.len {
            return Err(ValidationError::SizeMismatch {
                reported: self.len,
                counted,
            });
        }

        if Self::tombstone_period().is_some() && self.logical_size > 0 && !any_slack {
            return Err(ValidationError::TombstoneMissing);
        }

        Ok(())
    }

    /// Walks every live element and tallies how many buckets its
    /// successful probe visited, plus, for every preferred bucket, how many
    /// buckets an unsuccessful probe starting there would have to visit
    /// (`search_distance + 1`) — the same two statistics the reference
    /// table's `GetProbeStatistics` reports.
    pub(crate) fn probe_statistics(&self, hasher: impl Fn(&T) -> u64) -> ProbeStatistics {
        let mut stats = ProbeStatistics::new();
        for idx in 0..self.buckets.physical_len() {
            let bucket = self.buckets.bucket(idx);
            for slot in 0..SLOTS_PER_BUCKET {
                if !bucket.is_occupied(slot) {
                    continue;
                }
                // Safety: slot confirmed occupied above.
                let hash = hasher(unsafe { bucket.slot_ref(slot) });
                let preferred = h1(hash, self.logical_size.max(1));
                stats.record(idx.saturating_sub(preferred) + 1);
            }
        }
        for preferred in 0..self.logical_size {
            let bucket = self.buckets.bucket(preferred);
            let distance = if bucket.is_end_sentinel() {
                0
            } else {
                bucket.search_distance() as usize
            };
            stats.record_unsuccessful(distance + 1);
        }
        stats
    }
}

impl<T, P> Drop for RawTable<T, P> {
    fn drop(&mut self) {
        for idx in 0..self.buckets.physical_len() {
            let bucket = self.buckets.bucket_mut(idx);
            for slot in 0..SLOTS_PER_BUCKET {
                if bucket.is_occupied(slot) {
                    // Safety: slot confirmed occupied above.
                    drop(unsafe { bucket.read_slot(slot) });
                }
            }
        }
    }
}

pub(crate) struct RawIter<'a, T> {
    buckets: &'a Buckets<T>,
    bucket_idx: usize,
    slot: usize,
    remaining: usize,
}

impl<'a, T> Iterator for RawIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        while self.bucket_idx < self.buckets.physical_len() {
            let bucket = self.buckets.bucket(self.bucket_idx);
            let slot = bucket.next_occupied_from(self.slot);
            if slot != SLOTS_PER_BUCKET {
                self.slot = slot + 1;
                self.remaining -= 1;
                // Safety: slot confirmed occupied above.
                return Some(unsafe { bucket.slot_ref(slot) });
            }
            self.bucket_idx += 1;
            self.slot = 0;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for RawIter<'a, T> {}

pub(crate) struct RawIterMut<'a, T> {
    buckets: &'a mut Buckets<T>,
    bucket_idx: usize,
    slot: usize,
    remaining: usize,
}

impl<'a, T> Iterator for RawIterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        while self.bucket_idx < self.buckets.physical_len() {
            // Safety: reborrowing with the iterator's own lifetime `'a` is
            // sound because each slot is yielded at most once: `slot`/
            // `bucket_idx` only advance, never repeat.
            let bucket: &'a mut Bucket<T> =
                unsafe { &mut *(self.buckets.bucket_mut(self.bucket_idx) as *mut Bucket<T>) };
            let slot = bucket.next_occupied_from(self.slot);
            if slot != SLOTS_PER_BUCKET {
                self.slot = slot + 1;
                self.remaining -= 1;
                return Some(unsafe { bucket.slot_mut(slot) });
            }
            self.bucket_idx += 1;
            self.slot = 0;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for RawIterMut<'a, T> {}
