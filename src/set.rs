// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! A key-only graveyard-hashed set: `value_type == key_type`, built
//! directly on [`RawTable`] with no slot indirection.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use crate::config::PageReleaseConfig;
use crate::error::Result as ValidateResult;
use crate::params::{DefaultParams, GraveyardParams};
use crate::table::{make_hash, Holder, ProbeStatistics, RawIter, RawTable};

/// Default hasher: FxHash, chosen (as in the rest of this corpus) because
/// most keys used with this table are small integers or short strings,
/// where FxHash's lack of DoS resistance is an acceptable trade for speed.
pub type DefaultHashBuilder = fxhash::FxBuildHasher;

/// An open-addressed, graveyard-hashed set.
///
/// `P` selects the compile-time load-factor/tombstone profile (see
/// [`GraveyardParams`]); `S` is the hash builder, defaulting to
/// [`DefaultHashBuilder`].
pub struct GraveyardSet<T, P = DefaultParams, S = DefaultHashBuilder> {
    holder: Holder<S, ()>,
    table: RawTable<T, P>,
    _params: PhantomData<P>,
}

impl<T, P, S> GraveyardSet<T, P, S>
where
    P: GraveyardParams,
    S: Default,
{
    /// Creates an empty set. No allocation happens until the first insert.
    pub fn new() -> Self {
        GraveyardSet {
            holder: Holder::new(S::default(), ()),
            table: RawTable::new(),
            _params: PhantomData,
        }
    }
}

impl<T, P, S> Default for GraveyardSet<T, P, S>
where
    P: GraveyardParams,
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P, S> GraveyardSet<T, P, S>
where
    T: Eq + Hash,
    P: GraveyardParams,
    S: BuildHasher,
{
    /// Number of elements stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Largest `len` reachable before the next insert forces a rehash.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of physical buckets currently allocated.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Bytes held by the bucket array.
    #[inline]
    pub fn allocated_memory_size(&self) -> usize {
        self.table.allocated_memory_size()
    }

    /// Ensures a subsequent sequence of `additional` inserts does not
    /// trigger a rehash.
    pub fn reserve(&mut self, additional: usize) {
        let hash_builder = &self.holder.hasher;
        self.table
            .reserve(additional, |v| make_hash(hash_builder, v));
    }

    /// Rebuilds the table with a new logical bucket count of
    /// `ceil(slot_count / 14)`. `slot_count == 0` rehashes down to the
    /// minimum size that still fits the current contents at full load.
    pub fn rehash(&mut self, slot_count: usize) {
        let hash_builder = &self.holder.hasher;
        self.table.rehash(slot_count, |v| make_hash(hash_builder, v));
    }

    /// Rehashes using an explicit page-release cadence rather than the
    /// default, for callers tuning incremental memory release.
    pub fn rehash_with_config(&mut self, logical_size: usize, page_release: &PageReleaseConfig) {
        let hash_builder = &self.holder.hasher;
        log::debug!(
            "graveyard set rehash: {} -> {} logical buckets",
            self.table.logical_size(),
            logical_size
        );
        self.table.rehash_to_with_config(
            logical_size.max(1),
            |v| make_hash(hash_builder, v),
            page_release,
        );
    }

    /// Inserts `value`, returning `false` if an equal value was already
    /// present (the existing value is left untouched).
    pub fn insert(&mut self, value: T) -> bool {
        let hash = make_hash(&self.holder.hasher, &value);
        if self.table.contains(hash, |v| *v == value) {
            return false;
        }
        let hash_builder = &self.holder.hasher;
        self.table.insert(hash, value, |v| make_hash(hash_builder, v));
        true
    }

    /// Returns a reference to the stored value equal to `value`, if any.
    pub fn get<Q: ?Sized>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, value);
        self.table.get(hash, |v| v.borrow() == value)
    }

    #[inline]
    pub fn contains<Q: ?Sized>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.get(value).is_some()
    }

    /// `0` or `1`, matching the std-library convention for a set's `count`.
    #[inline]
    pub fn count<Q: ?Sized>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.contains(value) as usize
    }

    /// Removes and returns the stored value equal to `value`, if present.
    pub fn take<Q: ?Sized>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Removes the value equal to `value`. Returns `true` if one was
    /// removed.
    pub fn remove<Q: ?Sized>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.take(value).is_some()
    }

    /// Drops every stored value, keeping the current allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// The subrange of stored values equal to `value`: zero or one, since
    /// a set holds no duplicates. Named to match the reference table's
    /// `equal_range`, which on a unique-key container degenerates to the
    /// same thing `get` gives you.
    pub fn equal_range<Q: ?Sized>(&self, value: &Q) -> std::option::IntoIter<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.get(value).into_iter()
    }

    pub fn iter(&self) -> RawIter<'_, T> {
        self.table.iter()
    }

    /// Full-table consistency check; see [`crate::error::ValidationError`].
    pub fn validate(&self) -> ValidateResult<()> {
        let hash_builder = &self.holder.hasher;
        let result = self.table.validate(|v| make_hash(hash_builder, v));
        if let Err(ref e) = result {
            log::warn!("graveyard set failed validation: {}", e);
        }
        result
    }

    /// Per-bucket probe-length distribution across current contents.
    pub fn probe_statistics(&self) -> ProbeStatistics {
        let hash_builder = &self.holder.hasher;
        self.table.probe_statistics(|v| make_hash(hash_builder, v))
    }

    /// Number of buckets visited by a successful probe for `value`, or
    /// `None` if `value` is absent.
    pub fn successful_probe_length<Q: ?Sized>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, value);
        let (bucket_idx, _slot) = self.table.find(hash, |v| v.borrow() == value)?;
        let preferred = crate::table::h1(hash, self.table.logical_size().max(1));
        Some(bucket_idx.saturating_sub(preferred) + 1)
    }

    /// Exchanges the contents of `self` and `other` in constant time.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

impl<T, P, S> std::fmt::Debug for GraveyardSet<T, P, S>
where
    T: Eq + Hash + std::fmt::Debug,
    P: GraveyardParams,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T, P, S> IntoIterator for &'a GraveyardSet<T, P, S>
where
    T: Eq + Hash,
    P: GraveyardParams,
    S: BuildHasher,
{
    type Item = &'a T;
    type IntoIter = RawIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, P, S> Clone for GraveyardSet<T, P, S>
where
    T: Eq + Hash + Clone,
    P: GraveyardParams,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        let hash_builder = &self.holder.hasher;
        GraveyardSet {
            holder: Holder::new(self.holder.hasher.clone(), ()),
            table: self.table.copy_from(|v| make_hash(hash_builder, v)),
            _params: PhantomData,
        }
    }
}

impl<T, P, S> Extend<T> for GraveyardSet<T, P, S>
where
    T: Eq + Hash,
    P: GraveyardParams,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(lower);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T, P, S> std::iter::FromIterator<T> for GraveyardSet<T, P, S>
where
    T: Eq + Hash,
    P: GraveyardParams,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = GraveyardSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DefaultParams, HighLoadParams};

    #[test]
    fn basic_set_scenario() {
        let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        assert_eq!(set.insert(0), true);
        assert!(set.contains(&0));
        assert!(!set.contains(&1));
        assert_eq!(set.len(), 1);
        assert_eq!(set.insert(0), false);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn reserve_grows_to_fit_without_a_further_rehash() {
        let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        set.reserve(1000);
        let bucket_count_after_reserve = set.bucket_count();
        for i in 0..1000u64 {
            set.insert(i);
        }
        // reserve(1000) must have sized the table so that 1000 further
        // distinct inserts never trigger another rehash.
        assert_eq!(set.bucket_count(), bucket_count_after_reserve);
        assert_eq!(set.len(), 1000);
        // capacity() is defined as total slot count (bucket_count * 14),
        // matching the reference table's capacity()/bucket_count() split.
        assert_eq!(set.capacity(), set.bucket_count() * 14);
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
    fn insert_erase_contains_roundtrip() {
        let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        set.insert(5);
        assert!(set.remove(&5));
        assert!(!set.contains(&5));
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        for i in 0..50u64 {
            set.insert(i);
        }
        set.clear();
        assert_eq!(set.len(), 0);
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn validate_holds_under_hovering_workload_with_tombstones() {
        let mut set: GraveyardSet<u64, HighLoadParams> = GraveyardSet::new();
        for i in 0..2000u64 {
            set.insert(i);
        }
        for i in 0..2000u64 {
            if i % 4 == 0 {
                set.remove(&i);
            }
        }
        for i in 2000..2500u64 {
            set.insert(i);
        }
        set.validate().expect("set should remain internally consistent");
    }

    #[test]
    fn string_set_supports_borrow_lookup() {
        let mut set: GraveyardSet<String, DefaultParams> = GraveyardSet::new();
        set.insert("hello".to_string());
        assert!(set.contains("hello"));
        assert!(!set.contains("world"));
    }

    #[test]
    fn equal_range_is_zero_or_one_element() {
        let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        set.insert(5);
        assert_eq!(set.equal_range(&5).collect::<Vec<_>>(), vec![&5]);
        assert_eq!(set.equal_range(&6).collect::<Vec<_>>(), Vec::<&u64>::new());
    }

    #[test]
    fn swap_exchanges_contents() {
        let mut a: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        let mut b: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        a.insert(1);
        b.insert(2);
        b.insert(3);
        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert!(a.contains(&2) && a.contains(&3));
        assert_eq!(b.len(), 1);
        assert!(b.contains(&1));
    }

    #[test]
    fn successful_probe_length_is_none_for_absent_values() {
        let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        set.insert(1);
        assert_eq!(set.successful_probe_length(&2), None);
        assert!(set.successful_probe_length(&1).unwrap() >= 1);
    }

    #[test]
    fn debug_formats_as_a_set() {
        let mut set: GraveyardSet<u64, DefaultParams> = GraveyardSet::new();
        set.insert(1);
        let rendered = format!("{:?}", set);
        assert!(rendered.starts_with('{') && rendered.ends_with('}'));
        assert!(rendered.contains('1'));
    }
}
