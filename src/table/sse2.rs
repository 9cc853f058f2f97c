// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! SSE2 control-byte matching: one 128-bit load covers a whole bucket's
//! 16-byte control region (14 h2 bytes + search_distance + one pad byte)
//! so `match_mask`/`empty_mask` are a single compare-and-movemask.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use crate::table::bitmask::{mask_to_bucket_bits, BitMask};
use crate::table::{CTRL_BYTES, EMPTY};

#[derive(Copy, Clone)]
pub(crate) struct Group(__m128i);

impl Group {
    /// Number of control bytes read by one load. Only the low 14 are
    /// meaningful; see [`CTRL_BYTES`].
    pub(crate) const WIDTH: usize = CTRL_BYTES;

    /// # Safety
    /// `ctrl` must point to `CTRL_BYTES` readable bytes.
    #[inline]
    pub(crate) unsafe fn load(ctrl: *const u8) -> Self {
        Group(_mm_loadu_si128(ctrl as *const __m128i))
    }

    #[inline]
    pub(crate) fn match_byte(self, needle: u8) -> BitMask {
        unsafe {
            let cmp = _mm_cmpeq_epi8(self.0, _mm_set1_epi8(needle as i8));
            mask_to_bucket_bits(_mm_movemask_epi8(cmp) as u16)
        }
    }

    /// `kEmpty` (255) is the only control value with the sign bit set, so
    /// the empty mask is just the sign-bit movemask (no comparison needed).
    #[inline]
    pub(crate) fn match_empty(self) -> BitMask {
        static_assertions::const_assert!(EMPTY > 128);
        unsafe { mask_to_bucket_bits(_mm_movemask_epi8(self.0) as u16) }
    }

    #[inline]
    pub(crate) fn match_non_empty(self) -> BitMask {
        let BitMask(empty) = self.match_empty();
        mask_to_bucket_bits(!empty)
    }
}
