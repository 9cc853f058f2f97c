// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

// Modifications Copyright (c) KTH Royal Institute of Technology
// SPDX-License-Identifier: MIT

//! Incremental release of the old bucket array's pages back to the OS
//! while a rehash drains it, so peak RSS during a rehash of a
//! multi-gigabyte table doesn't double for the whole duration of the
//! rehash.

/// Advises the kernel that `[ptr, ptr + len)` is no longer needed, letting
/// it reclaim the backing pages without the memory being unmapped (a
/// following write simply faults a fresh zero page back in). A no-op on
/// platforms without `madvise`.
#[cfg(unix)]
pub(crate) fn release_pages(ptr: *const u8, len: usize) {
    if len == 0 {
        return;
    }
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    if page_size == 0 {
        return;
    }
    // MADV_DONTNEED requires a page-aligned address; round the advised
    // range inward so we never advise over memory outside `[ptr, ptr+len)`.
    let addr = ptr as usize;
    let aligned_addr = (addr + page_size - 1) & !(page_size - 1);
    if aligned_addr >= addr + len {
        return;
    }
    let aligned_len = (addr + len - aligned_addr) & !(page_size - 1);
    if aligned_len == 0 {
        return;
    }
    unsafe {
        libc::madvise(
            aligned_addr as *mut libc::c_void,
            aligned_len,
            libc::MADV_DONTNEED,
        );
    }
}

#[cfg(not(unix))]
pub(crate) fn release_pages(_ptr: *const u8, _len: usize) {}

/// Tracks progress through a rehash's source array and releases pages
/// every `period_buckets` buckets, so a single pass over a huge old table
/// returns memory incrementally rather than all at once at the end.
pub(crate) struct PageReleaseTracker {
    period_buckets: usize,
    buckets_since_release: usize,
    bucket_stride: usize,
    // Start of the run of already-drained buckets not yet advised away.
    range_start: Option<*const u8>,
}

impl PageReleaseTracker {
    pub(crate) fn new(period_buckets: usize, bucket_stride: usize) -> Self {
        PageReleaseTracker {
            period_buckets: period_buckets.max(1),
            buckets_since_release: 0,
            bucket_stride,
            range_start: None,
        }
    }

    /// Call once per old bucket drained, passing that bucket's address.
    /// Every `period_buckets` calls, advises the OS to drop the whole span
    /// of buckets drained since the last release (not just the most recent
    /// one), which is what actually keeps peak RSS bounded during a rehash
    /// of a huge table.
    pub(crate) fn advance(&mut self, bucket_ptr: *const u8) {
        if self.range_start.is_none() {
            self.range_start = Some(bucket_ptr);
        }
        self.buckets_since_release += 1;
        if self.buckets_since_release < self.period_buckets {
            return;
        }
        let start = self.range_start.take().expect("set above");
        release_pages(start, self.buckets_since_release * self.bucket_stride);
        self.buckets_since_release = 0;
    }
}
