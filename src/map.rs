// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! A key/value graveyard-hashed map. Stores `(K, V)` tuples directly in
//! bucket slots: unlike the reference implementation's `pair<K, V>` vs.
//! `pair<const K, V>` layout-compatibility trick (needed there to let a
//! rehash move keys instead of copying them while still handing callers a
//! const-key reference), Rust's ordinary move semantics and split
//! `(&K, &mut V)` borrows already get this for free, so there is no
//! analogous slot-layout optimization to implement here.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use crate::error::Result as ValidateResult;
use crate::params::{DefaultParams, GraveyardParams};
use crate::set::DefaultHashBuilder;
use crate::table::{make_hash, Holder, ProbeStatistics, RawTable};

/// An open-addressed, graveyard-hashed map from `K` to `V`.
pub struct GraveyardMap<K, V, P = DefaultParams, S = DefaultHashBuilder> {
    holder: Holder<S, ()>,
    table: RawTable<(K, V), P>,
    _params: PhantomData<P>,
}

impl<K, V, P, S> GraveyardMap<K, V, P, S>
where
    P: GraveyardParams,
    S: Default,
{
    pub fn new() -> Self {
        GraveyardMap {
            holder: Holder::new(S::default(), ()),
            table: RawTable::new(),
            _params: PhantomData,
        }
    }
}

impl<K, V, P, S> Default for GraveyardMap<K, V, P, S>
where
    P: GraveyardParams,
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P, S> GraveyardMap<K, V, P, S>
where
    K: Eq + Hash,
    P: GraveyardParams,
    S: BuildHasher,
{
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    #[inline]
    pub fn allocated_memory_size(&self) -> usize {
        self.table.allocated_memory_size()
    }

    pub fn reserve(&mut self, additional: usize) {
        let hash_builder = &self.holder.hasher;
        self.table
            .reserve(additional, |(k, _)| make_hash(hash_builder, k));
    }

    pub fn rehash(&mut self, slot_count: usize) {
        let hash_builder = &self.holder.hasher;
        self.table
            .rehash(slot_count, |(k, _)| make_hash(hash_builder, k));
    }

    /// Inserts `key => value`. If `key` was already present, the previous
    /// value is returned and replaced; otherwise `None` is returned and a
    /// new entry is inserted.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = make_hash(&self.holder.hasher, &key);
        if let Some((_, existing)) = self.table.get_mut(hash, |(k, _)| *k == key) {
            return Some(std::mem::replace(existing, value));
        }
        let hash_builder = &self.holder.hasher;
        self.table
            .insert(hash, (key, value), |(k, _)| make_hash(hash_builder, k));
        None
    }

    /// Construct-in-place only if `key` is absent: the value closure is
    /// not invoked when the key is already present, mirroring the
    /// reference table's `try_emplace` avoiding construction of the
    /// mapped type on a hit.
    pub fn try_emplace_with(&mut self, key: K, make_value: impl FnOnce() -> V) -> (&mut V, bool) {
        let hash = make_hash(&self.holder.hasher, &key);
        let absent = self.table.find(hash, |(k, _)| *k == key).is_none();
        if absent {
            let hash_builder = &self.holder.hasher;
            let (_, v) = self
                .table
                .insert(hash, (key, make_value()), |(k, _)| make_hash(hash_builder, k));
            return (v, true);
        }
        let (_, v) = self
            .table
            .get_mut(hash, |(k, _)| *k == key)
            .expect("checked present above");
        (v, false)
    }

    /// `try_emplace` for a value type that is cheap or natural to build
    /// eagerly; prefer [`Self::try_emplace_with`] when constructing `V` is
    /// expensive and should be skipped on a hit.
    pub fn try_emplace(&mut self, key: K, value: V) -> (&mut V, bool) {
        self.try_emplace_with(key, move || value)
    }

    /// Idiomatic rendition of the reference table's `operator[]`: returns
    /// a reference to the value for `key`, default-constructing and
    /// inserting one if absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.try_emplace_with(key, V::default).0
    }

    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, key);
        self.table
            .get(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut<Q: ?Sized>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, key);
        self.table
            .get_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    pub fn get_key_value<Q: ?Sized>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, key);
        self.table
            .get(hash, |(k, _)| k.borrow() == key)
            .map(|(k, v)| (k, v))
    }

    #[inline]
    pub fn contains_key<Q: ?Sized>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.get(key).is_some()
    }

    pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, key);
        self.table
            .remove(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    pub fn remove_entry<Q: ?Sized>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, key);
        self.table.remove(hash, |(k, _)| k.borrow() == key)
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// The subrange of entries keyed by `key`: zero or one, since a map
    /// holds one value per key. Named to match the reference table's
    /// `equal_range`.
    pub fn equal_range<Q: ?Sized>(&self, key: &Q) -> std::option::IntoIter<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.get_key_value(key).into_iter()
    }

    /// Exchanges the contents of `self` and `other` in constant time.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.table.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> + '_ {
        self.table.iter_mut().map(|(k, v)| (&*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    pub fn validate(&self) -> ValidateResult<()> {
        let hash_builder = &self.holder.hasher;
        let result = self.table.validate(|(k, _)| make_hash(hash_builder, k));
        if let Err(ref e) = result {
            log::warn!("graveyard map failed validation: {}", e);
        }
        result
    }

    pub fn probe_statistics(&self) -> ProbeStatistics {
        let hash_builder = &self.holder.hasher;
        self.table
            .probe_statistics(|(k, _)| make_hash(hash_builder, k))
    }

    /// Number of buckets visited by a successful probe for `key`, or `None`
    /// if `key` is absent.
    pub fn successful_probe_length<Q: ?Sized>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let hash = make_hash(&self.holder.hasher, key);
        let (bucket_idx, _slot) = self.table.find(hash, |(k, _)| k.borrow() == key)?;
        let preferred = crate::table::h1(hash, self.table.logical_size().max(1));
        Some(bucket_idx.saturating_sub(preferred) + 1)
    }
}

impl<K, V, P, S> std::fmt::Debug for GraveyardMap<K, V, P, S>
where
    K: Eq + Hash + std::fmt::Debug,
    V: std::fmt::Debug,
    P: GraveyardParams,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, P, S> Clone for GraveyardMap<K, V, P, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    P: GraveyardParams,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        let hash_builder = &self.holder.hasher;
        GraveyardMap {
            holder: Holder::new(self.holder.hasher.clone(), ()),
            table: self
                .table
                .copy_from(|(k, _)| make_hash(hash_builder, k)),
            _params: PhantomData,
        }
    }
}

impl<K, V, P, S> Extend<(K, V)> for GraveyardMap<K, V, P, S>
where
    K: Eq + Hash,
    P: GraveyardParams,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(lower);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, P, S> std::iter::FromIterator<(K, V)> for GraveyardMap<K, V, P, S>
where
    K: Eq + Hash,
    P: GraveyardParams,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = GraveyardMap::new();
        map.extend(iter);
        map
    }
}
