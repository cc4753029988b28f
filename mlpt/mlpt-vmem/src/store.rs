//! # Table Store
//!
//! Source of the page-aligned, zero-filled blocks that back page tables and
//! data pages.
//!
//! - [`Frame`] is the owned handle to one block. It is neither `Clone` nor
//!   `Copy`; the only way to give a block back is to move the frame into
//!   [`TableStore::free_frame`], so a block cannot be released twice.
//! - [`TableStore`] is the allocation seam. [`HostStore`] serves blocks from
//!   the global allocator; [`CountingStore`] wraps any store to count
//!   allocations and frees and to inject allocation failures.

use alloc::alloc::{Layout, alloc_zeroed, dealloc};
use alloc::collections::BTreeSet;
use core::fmt;
use core::ptr::NonNull;
use log::error;
use mlpt_addresses::PhysicalAddress;

/// Size in bytes of one table entry word.
const WORD_BYTES: usize = size_of::<u64>();

/// Owned, `size`-aligned block of `size` bytes.
///
/// The block's host address doubles as its simulated physical address.
/// Dropping a frame without handing it back to its store leaks the block.
#[must_use = "frames must be returned to their TableStore"]
pub struct Frame {
    ptr: NonNull<u8>,
    size: usize,
}

// Safety: a frame is the sole owner of its block.
unsafe impl Send for Frame {}
unsafe impl Sync for Frame {}

impl Frame {
    /// Take ownership of a raw block.
    ///
    /// # Safety
    /// - `ptr` must point to `size` readable and writable bytes that are
    ///   aligned to `size` and zero-initialized.
    /// - `size` must be a power of two and at least two words.
    /// - Nothing else may access the block while the frame exists.
    #[inline]
    pub const unsafe fn from_raw(ptr: NonNull<u8>, size: usize) -> Self {
        debug_assert!(size.is_power_of_two() && size >= 2 * WORD_BYTES);
        Self { ptr, size }
    }

    /// Give up ownership, returning the raw block.
    #[inline]
    #[must_use]
    pub const fn into_raw(self) -> (NonNull<u8>, usize) {
        (self.ptr, self.size)
    }

    /// Base address of the block.
    #[inline]
    #[must_use]
    pub fn base(&self) -> PhysicalAddress {
        PhysicalAddress::from_nonnull(self.ptr)
    }

    /// Size of the block in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// View the block as entry words.
    #[inline]
    #[must_use]
    pub const fn words(&self) -> &[u64] {
        // SAFETY: the block is owned, initialized, and aligned to at least 16 bytes.
        unsafe {
            core::slice::from_raw_parts(self.ptr.as_ptr().cast::<u64>(), self.size / WORD_BYTES)
        }
    }

    /// Mutable view of the block as entry words.
    #[inline]
    pub const fn words_mut(&mut self) -> &mut [u64] {
        // SAFETY: see `words`; `&mut self` guarantees exclusive access.
        unsafe {
            core::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<u64>(), self.size / WORD_BYTES)
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({}, {} bytes)", self.base(), self.size)
    }
}

/// Allocator for page table and data page blocks.
///
/// Implementations hand out zero-filled blocks of `size` bytes aligned to
/// `size` (a power of two) and accept exactly those frames back.
///
/// Returns `None` on out-of-memory.
pub trait TableStore {
    /// Allocate one zero-filled, `size`-aligned block of `size` bytes.
    fn alloc_frame(&mut self, size: usize) -> Option<Frame>;

    /// Release a frame previously returned by [`alloc_frame`](Self::alloc_frame).
    fn free_frame(&mut self, frame: Frame);
}

impl<T: TableStore + ?Sized> TableStore for &mut T {
    fn alloc_frame(&mut self, size: usize) -> Option<Frame> {
        (**self).alloc_frame(size)
    }

    fn free_frame(&mut self, frame: Frame) {
        (**self).free_frame(frame);
    }
}

/// [`TableStore`] backed by the global allocator.
#[derive(Copy, Clone, Debug, Default)]
pub struct HostStore;

impl TableStore for HostStore {
    fn alloc_frame(&mut self, size: usize) -> Option<Frame> {
        if size < 2 * WORD_BYTES {
            return None;
        }
        let layout = Layout::from_size_align(size, size).ok()?;
        // SAFETY: the layout has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) })?;
        // SAFETY: fresh zeroed allocation of `size` bytes aligned to `size`.
        Some(unsafe { Frame::from_raw(ptr, size) })
    }

    fn free_frame(&mut self, frame: Frame) {
        let (ptr, size) = frame.into_raw();
        // SAFETY: the same layout was accepted when the frame was allocated.
        unsafe { dealloc(ptr.as_ptr(), Layout::from_size_align_unchecked(size, size)) }
    }
}

/// Allocation counters of a [`CountingStore`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StoreStats {
    /// Successful allocations.
    pub allocated: usize,
    /// Frames returned.
    pub freed: usize,
    /// Allocation requests that were refused.
    pub failed: usize,
}

impl StoreStats {
    /// Frames currently handed out.
    #[inline]
    #[must_use]
    pub const fn live(&self) -> usize {
        self.allocated - self.freed
    }
}

/// [`TableStore`] wrapper that counts traffic and can run out on purpose.
///
/// With a budget set, only that many further allocations succeed; every
/// later request fails as if memory were exhausted.
#[derive(Debug, Default)]
pub struct CountingStore<S = HostStore> {
    inner: S,
    stats: StoreStats,
    budget: Option<usize>,
    live: BTreeSet<u64>,
}

impl<S: TableStore> CountingStore<S> {
    #[must_use]
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            stats: StoreStats {
                allocated: 0,
                freed: 0,
                failed: 0,
            },
            budget: None,
            live: BTreeSet::new(),
        }
    }

    /// Wrap `inner`, allowing only `budget` further allocations.
    #[must_use]
    pub const fn with_budget(inner: S, budget: usize) -> Self {
        let mut store = Self::new(inner);
        store.budget = Some(budget);
        store
    }

    /// Replace the remaining allocation budget; `None` lifts the limit.
    pub const fn set_budget(&mut self, budget: Option<usize>) {
        self.budget = budget;
    }

    #[inline]
    #[must_use]
    pub const fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Returns `true` if a frame with this base is currently handed out.
    #[must_use]
    pub fn is_live(&self, base: PhysicalAddress) -> bool {
        self.live.contains(&base.as_u64())
    }
}

impl<S: TableStore> TableStore for CountingStore<S> {
    fn alloc_frame(&mut self, size: usize) -> Option<Frame> {
        if self.budget == Some(0) {
            self.stats.failed += 1;
            return None;
        }

        let Some(frame) = self.inner.alloc_frame(size) else {
            self.stats.failed += 1;
            return None;
        };

        if let Some(budget) = self.budget.as_mut() {
            *budget -= 1;
        }
        self.stats.allocated += 1;
        self.live.insert(frame.base().as_u64());
        Some(frame)
    }

    fn free_frame(&mut self, frame: Frame) {
        if !self.live.remove(&frame.base().as_u64()) {
            error!("frame {} was not handed out by this store", frame.base());
        }
        self.stats.freed += 1;
        self.inner.free_frame(frame);
    }
}
