//! # Synchronization primitives for shared page tables
//!
//! The translation engine is single-threaded by contract. When several
//! threads need one table tree, [`RwSpinLock`] guards the whole tree:
//! translations take the shared side, allocations and deallocations the
//! exclusive side.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod rw_spin_lock;

pub use rw_spin_lock::{RwSpinLock, RwSpinReadGuard, RwSpinWriteGuard};
