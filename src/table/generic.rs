// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! Portable fallback for platforms without SSE2. Must produce bit-for-bit
//! identical masks to [`super::sse2::Group`] since `find_first_empty`
//! relies on trailing-zero order to pick a deterministic slot.

use crate::table::bitmask::{mask_to_bucket_bits, BitMask};
use crate::table::{CTRL_BYTES, EMPTY, SLOTS_PER_BUCKET};

#[derive(Copy, Clone)]
pub(crate) struct Group([u8; CTRL_BYTES]);

impl Group {
    pub(crate) const WIDTH: usize = CTRL_BYTES;

    /// # Safety
    /// `ctrl` must point to `CTRL_BYTES` readable bytes.
    #[inline]
    pub(crate) unsafe fn load(ctrl: *const u8) -> Self {
        let mut bytes = [0u8; CTRL_BYTES];
        core::ptr::copy_nonoverlapping(ctrl, bytes.as_mut_ptr(), CTRL_BYTES);
        Group(bytes)
    }

    #[inline]
    pub(crate) fn match_byte(self, needle: u8) -> BitMask {
        let mut mask: u16 = 0;
        for i in 0..SLOTS_PER_BUCKET {
            if self.0[i] == needle {
                mask |= 1 << i;
            }
        }
        mask_to_bucket_bits(mask)
    }

    #[inline]
    pub(crate) fn match_empty(self) -> BitMask {
        self.match_byte(EMPTY)
    }

    #[inline]
    pub(crate) fn match_non_empty(self) -> BitMask {
        let BitMask(empty) = self.match_empty();
        mask_to_bucket_bits(!empty)
    }
}
