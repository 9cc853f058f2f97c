// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! Storage for the hasher and key-equality objects carried by a table.
//!
//! Most hashers and `Eq` impls used with this table are zero-sized
//! (`FxBuildHasher`, function-pointer-free closures, derived `Eq`), and
//! wrapping both in a single struct lets the compiler apply its normal
//! zero-sized-field layout optimization rather than us hand-rolling one.
//! `static_assertions` below pins that behavior so a future change to
//! either field can't silently regress it.

use static_assertions::assert_eq_size;

#[derive(Clone, Default)]
pub(crate) struct Holder<H, E> {
    pub(crate) hasher: H,
    pub(crate) eq: E,
}

impl<H, E> Holder<H, E> {
    #[inline]
    pub(crate) fn new(hasher: H, eq: E) -> Self {
        Holder { hasher, eq }
    }
}

// Two zero-sized fields must not inflate the holder past the larger of the
// two's natural size (here, both zero).
assert_eq_size!(Holder<(), ()>, ());

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::size_of;

    #[derive(Default)]
    struct ZstHasher;
    #[derive(Default)]
    struct ZstEq;

    #[test]
    fn zst_pair_stays_zero_sized() {
        assert_eq!(size_of::<Holder<ZstHasher, ZstEq>>(), 0);
    }
}
