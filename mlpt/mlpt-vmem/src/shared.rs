//! # Shared Address Space
//!
//! [`SharedAddressSpace`] puts one [`AddressSpace`] behind a readers-writer
//! spin lock so it can be used from several threads. Translations run
//! concurrently; allocation, deallocation and teardown are exclusive. The
//! walk and pruning algorithms are exactly those of [`AddressSpace`].

use crate::address_space::{AddressSpace, AllocateError, DeallocateError, SpaceStats};
use crate::register::RootRegister;
use crate::store::{HostStore, TableStore};
use mlpt_addresses::{PhysicalAddress, VirtualAddress};
use mlpt_sync::RwSpinLock;

/// An [`AddressSpace`] guarded by a single [`RwSpinLock`].
pub struct SharedAddressSpace<S: TableStore = HostStore> {
    inner: RwSpinLock<AddressSpace<S>>,
}

impl<S: TableStore> SharedAddressSpace<S> {
    #[must_use]
    pub const fn new(space: AddressSpace<S>) -> Self {
        Self {
            inner: RwSpinLock::new(space),
        }
    }

    /// See [`AddressSpace::translate`].
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> PhysicalAddress {
        self.inner.read().translate(va)
    }

    /// See [`AddressSpace::query`].
    #[must_use]
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.inner.read().query(va)
    }

    #[must_use]
    pub fn root_register(&self) -> RootRegister {
        self.inner.read().root_register()
    }

    #[must_use]
    pub fn stats(&self) -> SpaceStats {
        self.inner.read().stats()
    }

    /// See [`AddressSpace::try_page_allocate`].
    ///
    /// # Errors
    /// Same as [`AddressSpace::try_page_allocate`].
    pub fn try_page_allocate(&self, va: VirtualAddress) -> Result<PhysicalAddress, AllocateError> {
        self.inner.write().try_page_allocate(va)
    }

    /// See [`AddressSpace::page_allocate`].
    pub fn page_allocate(&self, va: VirtualAddress) {
        self.inner.write().page_allocate(va);
    }

    /// See [`AddressSpace::try_page_deallocate`].
    ///
    /// # Errors
    /// Same as [`AddressSpace::try_page_deallocate`].
    pub fn try_page_deallocate(&self, va: VirtualAddress) -> Result<(), DeallocateError> {
        self.inner.write().try_page_deallocate(va)
    }

    /// See [`AddressSpace::page_deallocate`].
    #[must_use]
    pub fn page_deallocate(&self, va: VirtualAddress) -> bool {
        self.inner.write().page_deallocate(va)
    }

    /// See [`AddressSpace::clear`].
    #[must_use]
    pub fn clear(&self) -> usize {
        self.inner.write().clear()
    }

    /// Run `f` with shared access to the whole address space.
    pub fn with_read<R>(&self, f: impl FnOnce(&AddressSpace<S>) -> R) -> R {
        self.inner.with_read(f)
    }

    #[must_use]
    pub fn into_inner(self) -> AddressSpace<S> {
        self.inner.into_inner()
    }
}

impl<S: TableStore> From<AddressSpace<S>> for SharedAddressSpace<S> {
    fn from(space: AddressSpace<S>) -> Self {
        Self::new(space)
    }
}

impl Default for SharedAddressSpace<HostStore> {
    fn default() -> Self {
        Self::new(AddressSpace::default())
    }
}
