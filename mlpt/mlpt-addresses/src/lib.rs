//! # Virtual and Physical Addresses for the Simulated Page Table
//!
//! Strongly typed address wrappers plus the **address codec** that splits a
//! virtual address into per-level table indices and an in-page offset.
//!
//! ## Overview
//!
//! | Type | Description |
//! |------|-------------|
//! | [`VirtualAddress`] | Address as seen by the caller, to be translated. |
//! | [`PhysicalAddress`] | Address of backing memory, produced by translation. |
//! | [`Geometry`] | Validated `(levels, pobits)` pair driving every computation. |
//! | [`LevelIndex`] | Index into the table at one level of the walk. |
//!
//! ## Address layout
//!
//! With `P = pobits` and `L = levels`, a virtual address is read from the
//! least significant bit upwards:
//!
//! ```text
//! | ... ignored ... | index[L-1] | ... | index[1] | index[0] | offset |
//! |                 |   P - 3    |     |  P - 3   |  P - 3   |   P    |
//! ```
//!
//! `index[L-1]` selects the entry in the root table, `index[0]` the entry
//! that points at the data page.
//!
//! ```rust
//! # use mlpt_addresses::*;
//! let geometry = Geometry::new(2, 10).unwrap();
//! let va = VirtualAddress::new(0x0004_0C12);
//!
//! assert_eq!(geometry.page_offset(va), 0x012);
//! assert_eq!(geometry.level_index(va, 0).as_usize(), 0x03);
//! assert_eq!(geometry.level_index(va, 1).as_usize(), 0x02);
//! assert!(geometry.is_valid(va));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod geometry;
mod level_index;
mod physical_address;
mod virtual_address;

pub use crate::geometry::{Geometry, GeometryError};
pub use crate::level_index::LevelIndex;
pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::VirtualAddress;
