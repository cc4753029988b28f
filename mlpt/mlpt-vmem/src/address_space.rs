//! # Address Space
//!
//! [`AddressSpace`] owns one table tree together with the geometry that
//! shapes it and the [`TableStore`] that backs it. It replaces a process-wide
//! base register: every tree is its own value, and several can coexist.
//!
//! ## Operations
//!
//! - [`translate`](AddressSpace::translate) / [`query`](AddressSpace::query)
//!   walk root to leaf without side effects.
//! - [`page_allocate`](AddressSpace::page_allocate) materializes missing
//!   tables and the data page on the way down.
//! - [`page_deallocate`](AddressSpace::page_deallocate) removes one leaf and
//!   prunes every table that became empty, stopping below the root.
//! - [`clear`](AddressSpace::clear) releases the whole tree.
//!
//! The `try_` variants report failures as errors; the plain variants keep
//! the sentinel contract (`UNMAPPED`, silent no-op, `false`).
//!
//! ## Failure model
//!
//! Allocation stops at the first refused frame. Tables created before that
//! point stay linked: they are reachable and valid, they just lead to no
//! page yet. A later deallocation of the same address reports "not mapped"
//! and leaves them alone.

use crate::entry::PageTableEntry;
use crate::page_table::{PageTable, Slot, block_size};
use crate::register::RootRegister;
use crate::store::{HostStore, TableStore};
use alloc::boxed::Box;
use core::fmt;
use log::{debug, trace, warn};
use mlpt_addresses::{Geometry, LevelIndex, PhysicalAddress, VirtualAddress};

/// Handle to a single table tree.
pub struct AddressSpace<S: TableStore = HostStore> {
    geometry: Geometry,
    store: S,
    root: Option<Box<PageTable>>,
}

/// Error returned by [`AddressSpace::try_page_allocate`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocateError {
    #[error("virtual address {0} has a level index outside the table")]
    OutOfRange(VirtualAddress),
    /// `level` is the walk level whose entry could not be populated; the
    /// number of levels itself denotes the root register.
    #[error("out of memory while populating level {level}")]
    OutOfMemory { level: usize },
}

/// Error returned by [`AddressSpace::try_page_deallocate`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeallocateError {
    #[error("no page table has been created yet")]
    Uninitialized,
    #[error("no valid entry at level {level}")]
    NotMapped { level: usize },
}

/// Live node counts of an [`AddressSpace`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SpaceStats {
    /// Page tables, root included.
    pub tables: usize,
    /// Mapped data pages.
    pub pages: usize,
}

impl AddressSpace<HostStore> {
    /// Empty address space over the global allocator.
    #[must_use]
    pub const fn with_geometry(geometry: Geometry) -> Self {
        Self::new(geometry, HostStore)
    }
}

impl Default for AddressSpace<HostStore> {
    fn default() -> Self {
        Self::with_geometry(Geometry::CONFIGURED)
    }
}

impl<S: TableStore> AddressSpace<S> {
    /// Empty address space; the root register starts at the sentinel.
    #[must_use]
    pub const fn new(geometry: Geometry, store: S) -> Self {
        Self {
            geometry,
            store,
            root: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// The backing store, e.g. to read its counters.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Current value of the root register.
    #[must_use]
    pub fn root_register(&self) -> RootRegister {
        self.root
            .as_ref()
            .map_or(RootRegister::UNINITIALIZED, |root| {
                RootRegister::from_root(root.base())
            })
    }

    /// Index for `level`, or `None` if it does not fit the table.
    #[inline]
    fn index(&self, va: VirtualAddress, level: usize) -> Option<LevelIndex> {
        let index = self.geometry.level_index(va, level);
        (index.as_usize() < self.geometry.entries_per_table()).then_some(index)
    }

    /// The table holding `va`'s entry at `level`, if the walk reaches it.
    fn table_at(&self, va: VirtualAddress, level: usize) -> Option<&PageTable> {
        let mut table = self.root.as_deref()?;
        for current in (level + 1..self.geometry.levels()).rev() {
            table = table.child(self.index(va, current)?)?;
        }
        Some(table)
    }

    /// Translate `va`, or `None` if it is not mapped.
    ///
    /// Inspects exactly one entry per level on a hit and stops at the first
    /// invalid entry on a miss.
    #[must_use]
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let leaf_table = self.table_at(va, 0)?;
        let base = leaf_table.page(self.index(va, 0)?)?;
        Some(base | self.geometry.page_offset(va))
    }

    /// Translate `va`, returning [`PhysicalAddress::UNMAPPED`] if it is not mapped.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> PhysicalAddress {
        self.query(va).unwrap_or(PhysicalAddress::UNMAPPED)
    }

    /// The raw entry the walk for `va` reads at `level`.
    ///
    /// Returns `None` if `level` is out of range or the walk does not reach
    /// that level's table.
    #[must_use]
    pub fn entry(&self, va: VirtualAddress, level: usize) -> Option<PageTableEntry> {
        if level >= self.geometry.levels() {
            return None;
        }
        let table = self.table_at(va, level)?;
        Some(table.entry(self.index(va, level)?))
    }

    /// Ensure `va` is backed by a data page, creating tables as needed.
    ///
    /// Returns the base of the data page. Calling it again for an already
    /// mapped address allocates nothing and returns the same base.
    ///
    /// # Errors
    /// - [`AllocateError::OutOfRange`] if a level index of `va` does not fit.
    /// - [`AllocateError::OutOfMemory`] if the store refuses a frame. Tables
    ///   linked before the failure are kept.
    pub fn try_page_allocate(
        &mut self,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, AllocateError> {
        let geometry = self.geometry;
        if !geometry.is_valid(va) {
            return Err(AllocateError::OutOfRange(va));
        }

        let levels = geometry.levels();
        let Self { store, root, .. } = self;

        let mut table: &mut PageTable = match root {
            Some(existing) => &mut **existing,
            None => {
                let created = PageTable::allocate(store, geometry)
                    .ok_or(AllocateError::OutOfMemory { level: levels })?;
                debug!("created root table at {}", created.base());
                &mut **root.insert(Box::new(created))
            }
        };

        for level in (1..levels).rev() {
            let index = geometry.level_index(va, level);
            table = table
                .ensure_child(index, store, geometry)
                .ok_or(AllocateError::OutOfMemory { level })?;
        }

        let index = geometry.level_index(va, 0);
        if let Some(base) = table.page(index) {
            return Ok(base);
        }

        let page = store
            .alloc_frame(block_size(geometry))
            .ok_or(AllocateError::OutOfMemory { level: 0 })?;
        let base = page.base();
        table.install(index, Slot::Page(page), geometry);
        trace!("mapped {va} to page {base}");
        Ok(base)
    }

    /// Ensure `va` is backed by a data page; failures are logged and dropped.
    ///
    /// Check [`translate`](Self::translate) afterwards if the outcome matters.
    pub fn page_allocate(&mut self, va: VirtualAddress) {
        if let Err(e) = self.try_page_allocate(va) {
            warn!("page_allocate({va}) left without effect: {e}");
        }
    }

    /// Remove the mapping of `va` and prune tables that became empty.
    ///
    /// Nothing is modified unless the whole path down to the data page is
    /// valid. The root table is never pruned, so the root register keeps its
    /// value.
    ///
    /// # Errors
    /// - [`DeallocateError::Uninitialized`] before the first allocation.
    /// - [`DeallocateError::NotMapped`] at the first level whose entry is invalid.
    pub fn try_page_deallocate(&mut self, va: VirtualAddress) -> Result<(), DeallocateError> {
        let geometry = self.geometry;
        let Self { store, root, .. } = self;
        let root = root.as_deref_mut().ok_or(DeallocateError::Uninitialized)?;
        unmap(root, va, geometry.levels() - 1, geometry, store)?;
        trace!("unmapped {va}");
        Ok(())
    }

    /// Remove the mapping of `va`; returns `true` if one existed.
    pub fn page_deallocate(&mut self, va: VirtualAddress) -> bool {
        self.try_page_deallocate(va).is_ok()
    }

    /// Release every page and table, root included.
    ///
    /// The root register returns to the sentinel. Returns the number of
    /// frames handed back to the store.
    pub fn clear(&mut self) -> usize {
        let Some(root) = self.root.take() else {
            return 0;
        };
        let freed = (*root).release(&mut self.store);
        debug!("released {freed} frames");
        freed
    }

    /// Count the live tables and pages.
    #[must_use]
    pub fn stats(&self) -> SpaceStats {
        self.root.as_deref().map_or_else(SpaceStats::default, |root| {
            let (tables, pages) = root.census();
            SpaceStats { tables, pages }
        })
    }
}

/// Remove the leaf for `va` below `table` (which sits at `level`).
///
/// Validity is checked on the way down before anything changes; on the way
/// back up every child table that is now empty is freed and unlinked.
fn unmap<S: TableStore>(
    table: &mut PageTable,
    va: VirtualAddress,
    level: usize,
    geometry: Geometry,
    store: &mut S,
) -> Result<(), DeallocateError> {
    let index = geometry.level_index(va, level);

    if level == 0 {
        if table.page(index).is_none() {
            return Err(DeallocateError::NotMapped { level });
        }
        if let Slot::Page(page) = table.take(index) {
            store.free_frame(page);
        }
        return Ok(());
    }

    let child = table
        .child_mut(index)
        .ok_or(DeallocateError::NotMapped { level })?;
    unmap(child, va, level - 1, geometry, store)?;

    if child.is_empty() {
        if let Slot::Table(child) = table.take(index) {
            debug!("pruned empty level {} table at {}", level - 1, child.base());
            store.free_frame((*child).into_frame());
        }
    }
    Ok(())
}

impl<S: TableStore> Drop for AddressSpace<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<S: TableStore> fmt::Debug for AddressSpace<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("geometry", &self.geometry)
            .field("root", &self.root_register())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
