//! # Page Table Geometry
//!
//! Build-time configuration of the simulated page table.
//!
//! The two parameters are fixed per build. They default to three levels and
//! ten offset bits and can be overridden through the `MLPT_LEVELS` and
//! `MLPT_POBITS` environment variables when compiling:
//!
//! ```text
//! MLPT_LEVELS=2 MLPT_POBITS=12 cargo build
//! ```
//!
//! | Constant | Meaning |
//! |----------|---------|
//! | [`LEVELS`] | Number of tables consulted per translation. |
//! | [`POBITS`] | Page offset bits; pages and tables are `2^POBITS` bytes. |
//!
//! Each table occupies exactly one page and stores 8-byte entries, so it
//! holds `2^(POBITS - 3)` entries and every level consumes `POBITS - 3` bits
//! of the virtual address.

#![cfg_attr(not(any(test, doctest)), no_std)]

include!(concat!(env!("OUT_DIR"), "/geometry.rs"));

/// Size of a page (and of a page table) in bytes.
pub const PAGE_SIZE: u64 = 1 << POBITS;

/// Number of virtual address bits consumed by one table level.
pub const INDEX_BITS: u32 = POBITS - 3;

/// Number of entries held by one page table.
pub const ENTRIES_PER_TABLE: usize = 1 << INDEX_BITS;

/// Number of low virtual address bits that take part in translation.
#[allow(clippy::cast_possible_truncation)]
pub const VIRTUAL_BITS: u32 = POBITS + (LEVELS as u32) * INDEX_BITS;

const _: () = {
    assert!(LEVELS >= 1);
    assert!(POBITS >= 4 && POBITS <= 32);
    assert!(ENTRIES_PER_TABLE >= 2);
    assert!(VIRTUAL_BITS <= 64);
};
