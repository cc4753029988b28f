//! # Multi-Level Page Table Simulation
//!
//! Software model of a hardware multi-level page table. Virtual addresses
//! are translated by walking a tree of tables, from the root table down to a
//! data page. Tables and pages are created on demand and reclaimed as soon
//! as they no longer hold any mapping.
//!
//! ## What you get
//! - An [`AddressSpace`] owning one table tree and its [`RootRegister`].
//! - The [`PageTableEntry`] word format stored inside every table.
//! - A [`TableStore`] seam for the page-aligned blocks, with the
//!   [`HostStore`] and [`CountingStore`] implementations.
//! - A [`SharedAddressSpace`] for use from several threads.
//!
//! ## Virtual Address → Physical Address Walk
//!
//! With `L` levels and `P` offset bits, each table is one `2^P`-byte page
//! holding `2^(P-3)` eight-byte entries:
//!
//! ```text
//!  root (L-1)  →  ...  →  level 1  →  level 0  →  data page
//!      │                     │           │
//!      │                     │           └──► entry → data page base
//!      │                     └──────────────► entry → level 0 table
//!      └────────────────────────────────────► entry → next table
//! ```
//!
//! The physical address is the data page base joined with the low `P` bits
//! of the virtual address.
//!
//! ## Lifecycle
//!
//! - The root register holds `0` until the first allocation creates the root.
//! - [`AddressSpace::page_allocate`] creates at most one table per missing
//!   level plus the data page.
//! - [`AddressSpace::page_deallocate`] frees the data page and every table
//!   below the root that is left without valid entries.
//! - [`AddressSpace::clear`], and dropping the address space, release the rest.
//!
//! ```rust
//! use mlpt_vmem::{AddressSpace, Geometry, VirtualAddress};
//!
//! let mut space = AddressSpace::with_geometry(Geometry::new(2, 10).unwrap());
//! let va = VirtualAddress::new(0x400);
//! assert!(space.translate(va).is_unmapped());
//!
//! space.page_allocate(va);
//! let pa = space.translate(va);
//! assert_eq!(pa.as_u64() & 0x3FF, 0);
//! assert_eq!(space.translate(VirtualAddress::new(0x4FF)), pa | 0xFF);
//!
//! assert!(space.page_deallocate(va));
//! assert!(space.translate(va).is_unmapped());
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod address_space;
mod entry;
mod page_table;
mod register;
mod shared;
pub mod store;

pub use crate::address_space::{AddressSpace, AllocateError, DeallocateError, SpaceStats};
pub use crate::entry::PageTableEntry;
pub use crate::register::RootRegister;
pub use crate::shared::SharedAddressSpace;
pub use crate::store::{CountingStore, Frame, HostStore, StoreStats, TableStore};
pub use mlpt_addresses::{Geometry, GeometryError, LevelIndex, PhysicalAddress, VirtualAddress};

/// Re-export of the build-time configuration.
pub use mlpt_info as info;
