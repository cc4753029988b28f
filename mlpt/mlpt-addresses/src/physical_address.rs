use core::fmt;
use core::ops::BitOr;
use core::ptr::NonNull;

/// Physical memory address.
///
/// In the simulation the "physical" address of a block is its host address,
/// so table and page bases are genuine pointers handed out by the table
/// store.
///
/// The all-ones value is reserved as [`UNMAPPED`](Self::UNMAPPED) and is what
/// a failed translation reports.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    /// Sentinel for "no physical address": every bit set.
    pub const UNMAPPED: Self = Self(u64::MAX);

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub fn from_nonnull<T>(ptr: NonNull<T>) -> Self {
        Self(ptr.as_ptr().addr() as u64)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` for the [`UNMAPPED`](Self::UNMAPPED) sentinel.
    #[inline]
    #[must_use]
    pub const fn is_unmapped(self) -> bool {
        self.0 == Self::UNMAPPED.0
    }

    /// Returns `true` if the address is a multiple of `align` (a power of two).
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, align: u64) -> bool {
        debug_assert!(align.is_power_of_two());
        self.0 & (align - 1) == 0
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(v: PhysicalAddress) -> Self {
        v.as_u64()
    }
}

/// Joins a page base with an in-page offset.
impl BitOr<u64> for PhysicalAddress {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: u64) -> Self::Output {
        Self(self.0 | rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_all_ones() {
        assert_eq!(PhysicalAddress::UNMAPPED.as_u64(), !0);
        assert!(PhysicalAddress::UNMAPPED.is_unmapped());
        assert!(!PhysicalAddress::new(0x400).is_unmapped());
    }

    #[test]
    fn alignment() {
        assert!(PhysicalAddress::new(0x1000).is_aligned(0x400));
        assert!(!PhysicalAddress::new(0x1010).is_aligned(0x400));
    }
}
