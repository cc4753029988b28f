//! # Page Table Nodes
//!
//! A [`PageTable`] owns the frame that holds its entry words plus one
//! [`Slot`] per entry recording what the entry references:
//!
//! - [`Slot::Table`] owns the next-level table (interior levels),
//! - [`Slot::Page`] owns the data page frame (level 0),
//! - [`Slot::Vacant`] is an absent entry.
//!
//! Slot changes go through [`PageTable::install`] and [`PageTable::take`],
//! which keep the frame's entry words and the valid-entry count in step with
//! the slots. Ownership follows the tree: a child is moved into its parent's
//! slot on creation and moved out again when it is pruned.

use crate::entry::PageTableEntry;
use crate::store::{Frame, TableStore};
use alloc::boxed::Box;
use alloc::vec::Vec;
use mlpt_addresses::{Geometry, LevelIndex, PhysicalAddress};

/// What a table entry references.
#[derive(Debug)]
pub enum Slot {
    Vacant,
    Table(Box<PageTable>),
    Page(Frame),
}

impl Slot {
    /// Base address of the referenced table or page.
    fn base(&self) -> Option<PhysicalAddress> {
        match self {
            Self::Vacant => None,
            Self::Table(table) => Some(table.base()),
            Self::Page(frame) => Some(frame.base()),
        }
    }
}

/// One table of the tree: `entries_per_table` slots backed by one frame.
#[derive(Debug)]
pub struct PageTable {
    frame: Frame,
    slots: Box<[Slot]>,
    /// Number of non-vacant slots.
    live: usize,
}

impl PageTable {
    /// Build an empty table over a freshly allocated, zeroed frame.
    ///
    /// # Errors
    /// Hands `frame` back if the slot array cannot be allocated.
    pub fn new(frame: Frame, geometry: Geometry) -> Result<Self, Frame> {
        debug_assert_eq!(frame.size() as u64, geometry.page_size());
        let Some(slots) = vacant_slots(geometry.entries_per_table()) else {
            return Err(frame);
        };
        Ok(Self {
            frame,
            slots,
            live: 0,
        })
    }

    /// Allocate a frame from `store` and build an empty table over it.
    ///
    /// Returns `None` if either the frame or the slot array is unavailable;
    /// nothing is left allocated in that case.
    pub fn allocate<S: TableStore>(store: &mut S, geometry: Geometry) -> Option<Self> {
        let frame = store.alloc_frame(block_size(geometry))?;
        match Self::new(frame, geometry) {
            Ok(table) => Some(table),
            Err(frame) => {
                log::warn!("no memory for the slots of table {}", frame.base());
                store.free_frame(frame);
                None
            }
        }
    }

    /// Base address of this table's frame.
    #[inline]
    #[must_use]
    pub fn base(&self) -> PhysicalAddress {
        self.frame.base()
    }

    /// The raw entry word stored in the frame at `index`.
    #[inline]
    #[must_use]
    pub fn entry(&self, index: LevelIndex) -> PageTableEntry {
        PageTableEntry::from_bits(self.frame.words()[index.as_usize()])
    }

    /// Number of valid entries.
    #[inline]
    #[must_use]
    pub const fn live_entries(&self) -> usize {
        self.live
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    #[must_use]
    pub fn slot(&self, index: LevelIndex) -> &Slot {
        &self.slots[index.as_usize()]
    }

    /// The child table referenced at `index`, if any.
    #[inline]
    #[must_use]
    pub fn child(&self, index: LevelIndex) -> Option<&Self> {
        match self.slot(index) {
            Slot::Table(table) => Some(table),
            Slot::Vacant | Slot::Page(_) => None,
        }
    }

    /// Mutable access to the child table referenced at `index`, if any.
    #[inline]
    pub fn child_mut(&mut self, index: LevelIndex) -> Option<&mut Self> {
        match &mut self.slots[index.as_usize()] {
            Slot::Table(table) => Some(table),
            Slot::Vacant | Slot::Page(_) => None,
        }
    }

    /// Base address of the data page referenced at `index`, if any.
    #[inline]
    #[must_use]
    pub fn page(&self, index: LevelIndex) -> Option<PhysicalAddress> {
        match self.slot(index) {
            Slot::Page(frame) => Some(frame.base()),
            Slot::Vacant | Slot::Table(_) => None,
        }
    }

    /// Return the child table at `index`, creating it if the entry is vacant.
    ///
    /// Returns `None` if the store cannot provide a frame for the new table.
    pub fn ensure_child<S: TableStore>(
        &mut self,
        index: LevelIndex,
        store: &mut S,
        geometry: Geometry,
    ) -> Option<&mut Self> {
        if matches!(self.slot(index), Slot::Vacant) {
            let child = Self::allocate(store, geometry)?;
            log::trace!("linked table {} at index {index} of {}", child.base(), self.base());
            self.install(index, Slot::Table(Box::new(child)), geometry);
        }
        self.child_mut(index)
    }

    /// Put `slot` into the vacant entry at `index` and write its PTE.
    ///
    /// ### Debug assertions
    /// - Asserts the entry was vacant and `slot` is not.
    pub fn install(&mut self, index: LevelIndex, slot: Slot, geometry: Geometry) {
        let i = index.as_usize();
        debug_assert!(matches!(self.slots[i], Slot::Vacant), "entry {i} is in use");

        let Some(base) = slot.base() else {
            return;
        };
        self.frame.words_mut()[i] = PageTableEntry::link(base, geometry).into_bits();
        self.slots[i] = slot;
        self.live += 1;
    }

    /// Move the slot at `index` out, clearing its PTE.
    pub fn take(&mut self, index: LevelIndex) -> Slot {
        let i = index.as_usize();
        let slot = core::mem::replace(&mut self.slots[i], Slot::Vacant);
        if !matches!(slot, Slot::Vacant) {
            self.frame.words_mut()[i] = PageTableEntry::INVALID.into_bits();
            self.live -= 1;
        }
        slot
    }

    /// Free this table and everything beneath it, children first.
    ///
    /// Returns the number of frames handed back to `store`.
    pub fn release<S: TableStore>(self, store: &mut S) -> usize {
        let Self { frame, slots, .. } = self;
        let mut freed = 0;
        for slot in Vec::from(slots) {
            match slot {
                Slot::Vacant => {}
                Slot::Table(child) => freed += (*child).release(store),
                Slot::Page(page) => {
                    store.free_frame(page);
                    freed += 1;
                }
            }
        }
        store.free_frame(frame);
        freed + 1
    }

    /// Give up an empty table, returning its frame.
    ///
    /// ### Debug assertions
    /// - Asserts the table has no valid entries.
    #[inline]
    pub fn into_frame(self) -> Frame {
        debug_assert!(self.is_empty(), "table still has {} entries", self.live);
        self.frame
    }

    /// Count the tables (this one included) and data pages in this subtree.
    #[must_use]
    pub fn census(&self) -> (usize, usize) {
        self.slots
            .iter()
            .fold((1, 0), |(tables, pages), slot| match slot {
                Slot::Vacant => (tables, pages),
                Slot::Table(child) => {
                    let (t, p) = child.census();
                    (tables + t, pages + p)
                }
                Slot::Page(_) => (tables, pages + 1),
            })
    }
}

/// `count` vacant slots, or `None` if the host allocator refuses the array.
fn vacant_slots(count: usize) -> Option<Box<[Slot]>> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(count).ok()?;
    slots.resize_with(count, || Slot::Vacant);
    Some(slots.into_boxed_slice())
}

/// Block size requested from the store for tables and pages.
#[inline]
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub const fn block_size(geometry: Geometry) -> usize {
    geometry.page_size() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CountingStore, HostStore};

    fn geometry() -> Geometry {
        Geometry::new(2, 10).unwrap()
    }

    #[test]
    fn install_writes_pte_and_counts() {
        let g = geometry();
        let mut store = CountingStore::new(HostStore);
        let mut table = PageTable::allocate(&mut store, g).unwrap();
        let page = store.alloc_frame(block_size(g)).unwrap();
        let page_base = page.base();

        let idx = LevelIndex::new(5);
        table.install(idx, Slot::Page(page), g);

        assert_eq!(table.live_entries(), 1);
        assert_eq!(table.page(idx), Some(page_base));
        assert_eq!(table.entry(idx).base(g), Some(page_base));
        assert_eq!(table.entry(idx).into_bits(), page_base.as_u64() | 1);
        assert!(!table.entry(LevelIndex::new(4)).valid());

        assert_eq!(table.release(&mut store), 2);
        assert_eq!(store.stats().live(), 0);
    }

    #[test]
    fn take_clears_pte() {
        let g = geometry();
        let mut store = HostStore;
        let mut table = PageTable::allocate(&mut store, g).unwrap();
        let idx = LevelIndex::new(0);

        assert!(table.ensure_child(idx, &mut store, g).is_some());
        assert!(table.entry(idx).valid());

        let Slot::Table(child) = table.take(idx) else {
            panic!("expected a table");
        };
        assert!(table.is_empty());
        assert_eq!(table.entry(idx), PageTableEntry::INVALID);
        assert!(matches!(table.take(idx), Slot::Vacant));
        assert!(table.is_empty());

        store.free_frame((*child).into_frame());
        table.release(&mut store);
    }

    #[test]
    fn ensure_child_reuses_existing_table() {
        let g = geometry();
        let mut store = CountingStore::new(HostStore);
        let mut table = PageTable::allocate(&mut store, g).unwrap();
        let idx = LevelIndex::new(9);

        let first = table.ensure_child(idx, &mut store, g).unwrap().base();
        let second = table.ensure_child(idx, &mut store, g).unwrap().base();
        assert_eq!(first, second);
        assert_eq!(store.stats().allocated, 2);
        assert_eq!(table.census(), (2, 0));

        table.release(&mut store);
        assert_eq!(store.stats().live(), 0);
    }

    #[test]
    fn oversized_slot_array_is_refused() {
        assert!(vacant_slots(usize::MAX / 2).is_none());
        assert_eq!(vacant_slots(4).map(|s| s.len()), Some(4));
    }

    #[test]
    fn ensure_child_reports_exhaustion() {
        let g = geometry();
        let mut store = CountingStore::with_budget(HostStore, 1);
        let mut table = PageTable::allocate(&mut store, g).unwrap();
        assert!(table.ensure_child(LevelIndex::new(1), &mut store, g).is_none());
        assert!(table.is_empty());
        assert!(!table.entry(LevelIndex::new(1)).valid());
        table.release(&mut store);
    }
}
