//! # Root Register
//!
//! The simulated page table base register: the physical base of the root
//! table, or `0` while no mapping has ever been created.

use core::fmt;
use mlpt_addresses::PhysicalAddress;

/// Value of an address space's root register.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct RootRegister(u64);

impl RootRegister {
    /// The sentinel held before the first allocation.
    pub const UNINITIALIZED: Self = Self(0);

    /// Register pointing at the root table based at `root`.
    #[inline]
    #[must_use]
    pub const fn from_root(root: PhysicalAddress) -> Self {
        debug_assert!(root.as_u64() != 0);
        Self(root.as_u64())
    }

    /// Raw register value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_initialized(self) -> bool {
        self.0 != Self::UNINITIALIZED.0
    }

    /// The root table base, or `None` for the sentinel.
    #[inline]
    #[must_use]
    pub const fn root(self) -> Option<PhysicalAddress> {
        if self.is_initialized() {
            Some(PhysicalAddress::new(self.0))
        } else {
            None
        }
    }
}

impl fmt::Debug for RootRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootRegister(0x{:016X})", self.0)
    }
}

impl From<RootRegister> for u64 {
    #[inline]
    fn from(value: RootRegister) -> Self {
        value.as_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_zero() {
        assert_eq!(RootRegister::default(), RootRegister::UNINITIALIZED);
        assert_eq!(RootRegister::UNINITIALIZED.as_u64(), 0);
        assert!(!RootRegister::UNINITIALIZED.is_initialized());
        assert_eq!(RootRegister::UNINITIALIZED.root(), None);
    }

    #[test]
    fn holds_root_base() {
        let reg = RootRegister::from_root(PhysicalAddress::new(0x8000));
        assert!(reg.is_initialized());
        assert_eq!(reg.root(), Some(PhysicalAddress::new(0x8000)));
        assert_eq!(u64::from(reg), 0x8000);
    }
}
