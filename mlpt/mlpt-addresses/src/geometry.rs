//! # Page Table Geometry and Address Codec
//!
//! [`Geometry`] fixes the shape of the table tree: the number of levels and
//! the number of page-offset bits. All address decomposition goes through it.
//!
//! Entries are one 64-bit word, so a table of `2^pobits` bytes holds
//! `2^(pobits - 3)` entries and each level consumes `pobits - 3` bits of the
//! virtual address.

use crate::{LevelIndex, VirtualAddress};

/// Smallest accepted offset width: a table must hold at least two entries.
const MIN_POBITS: u32 = 4;

/// Largest accepted offset width (4 GiB blocks).
const MAX_POBITS: u32 = 32;

/// Size in bytes of one page table entry.
const ENTRY_BYTES_SHIFT: u32 = 3;

/// Validated page-table shape.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Geometry {
    levels: usize,
    pobits: u32,
}

/// Reasons a `(levels, pobits)` pair is rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("a page table needs at least one level")]
    NoLevels,
    #[error("{pobits} offset bits leave fewer than two entries per table")]
    PageTooSmall { pobits: u32 },
    #[error("{pobits} offset bits exceed the supported page size")]
    PageTooLarge { pobits: u32 },
    #[error("translation needs {bits} address bits, more than the 64-bit word provides")]
    AddressTooWide { bits: u64 },
}

impl Geometry {
    /// The geometry fixed at build time (see [`mlpt_info`]).
    pub const CONFIGURED: Self = match Self::new(mlpt_info::LEVELS, mlpt_info::POBITS) {
        Ok(geometry) => geometry,
        Err(_) => panic!("invalid build-time page table geometry"),
    };

    /// Validate and build a geometry.
    ///
    /// # Errors
    /// - [`GeometryError::NoLevels`] if `levels` is zero.
    /// - [`GeometryError::PageTooSmall`] / [`GeometryError::PageTooLarge`] if
    ///   `pobits` is outside `4..=32`.
    /// - [`GeometryError::AddressTooWide`] if `pobits + levels * (pobits - 3)`
    ///   does not fit into 64 bits; index extraction would otherwise shift
    ///   past the word width.
    pub const fn new(levels: usize, pobits: u32) -> Result<Self, GeometryError> {
        if levels == 0 {
            return Err(GeometryError::NoLevels);
        }
        if pobits < MIN_POBITS {
            return Err(GeometryError::PageTooSmall { pobits });
        }
        if pobits > MAX_POBITS {
            return Err(GeometryError::PageTooLarge { pobits });
        }

        // Saturates so absurd level counts still report as too wide.
        let bits = (levels as u64)
            .saturating_mul((pobits - ENTRY_BYTES_SHIFT) as u64)
            .saturating_add(pobits as u64);
        if bits > u64::BITS as u64 {
            return Err(GeometryError::AddressTooWide { bits });
        }

        Ok(Self { levels, pobits })
    }

    /// Number of table levels; level `levels - 1` is the root.
    #[inline]
    #[must_use]
    pub const fn levels(self) -> usize {
        self.levels
    }

    /// Number of page-offset bits.
    #[inline]
    #[must_use]
    pub const fn pobits(self) -> u32 {
        self.pobits
    }

    /// Size of a page or table block in bytes.
    #[inline]
    #[must_use]
    pub const fn page_size(self) -> u64 {
        1 << self.pobits
    }

    /// Mask selecting the in-page offset bits.
    #[inline]
    #[must_use]
    pub const fn offset_mask(self) -> u64 {
        self.page_size() - 1
    }

    /// Mask selecting the page base bits (the complement of [`offset_mask`](Self::offset_mask)).
    #[inline]
    #[must_use]
    pub const fn page_mask(self) -> u64 {
        !self.offset_mask()
    }

    /// Number of virtual address bits consumed per level.
    #[inline]
    #[must_use]
    pub const fn index_bits(self) -> u32 {
        self.pobits - ENTRY_BYTES_SHIFT
    }

    /// Mask applied to a shifted address to extract one level index.
    #[inline]
    #[must_use]
    pub const fn index_mask(self) -> u64 {
        (1 << self.index_bits()) - 1
    }

    /// Number of entries in one table.
    #[inline]
    #[must_use]
    pub const fn entries_per_table(self) -> usize {
        1 << self.index_bits()
    }

    /// Number of low virtual address bits that participate in translation.
    ///
    /// Bits above this width are ignored by the walk.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn virtual_bits(self) -> u32 {
        self.pobits + self.levels as u32 * self.index_bits()
    }

    /// The in-page offset of `va`: its low `pobits` bits.
    #[inline]
    #[must_use]
    pub const fn page_offset(self, va: VirtualAddress) -> u64 {
        va.as_u64() & self.offset_mask()
    }

    /// The table index `va` selects at `level`.
    ///
    /// Shifts `va` right by `pobits + level * (pobits - 3)` and keeps the low
    /// `pobits - 3` bits.
    ///
    /// ### Debug assertions
    /// - Asserts `level < levels`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn level_index(self, va: VirtualAddress, level: usize) -> LevelIndex {
        debug_assert!(level < self.levels);
        let shift = self.pobits + level as u32 * self.index_bits();
        LevelIndex::new(((va.as_u64() >> shift) & self.index_mask()) as usize)
    }

    /// Returns `true` if every level index of `va` lies inside a table.
    ///
    /// Bits above [`virtual_bits`](Self::virtual_bits) are not inspected.
    #[must_use]
    pub const fn is_valid(self, va: VirtualAddress) -> bool {
        let mut level = 0;
        while level < self.levels {
            if self.level_index(va, level).as_usize() >= self.entries_per_table() {
                return false;
            }
            level += 1;
        }
        true
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::CONFIGURED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_sizes() {
        let g = Geometry::new(3, 10).unwrap();
        assert_eq!(g.page_size(), 1024);
        assert_eq!(g.entries_per_table(), 128);
        assert_eq!(g.index_bits(), 7);
        assert_eq!(g.index_mask(), 0x7F);
        assert_eq!(g.offset_mask(), 0x3FF);
        assert_eq!(g.page_mask(), !0x3FF);
        assert_eq!(g.virtual_bits(), 31);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert_eq!(Geometry::new(0, 12), Err(GeometryError::NoLevels));
        assert_eq!(
            Geometry::new(2, 3),
            Err(GeometryError::PageTooSmall { pobits: 3 })
        );
        assert_eq!(
            Geometry::new(1, 33),
            Err(GeometryError::PageTooLarge { pobits: 33 })
        );
        // 12 + 6 * 9 = 66 bits
        assert_eq!(
            Geometry::new(6, 12),
            Err(GeometryError::AddressTooWide { bits: 66 })
        );
        assert_eq!(
            Geometry::new(usize::MAX, 12),
            Err(GeometryError::AddressTooWide { bits: u64::MAX })
        );
        assert_eq!(
            Geometry::new(usize::MAX, 4),
            Err(GeometryError::AddressTooWide { bits: u64::MAX })
        );
    }

    #[test]
    fn accepts_boundary_shapes() {
        // two entries per table
        let tiny = Geometry::new(1, 4).unwrap();
        assert_eq!(tiny.entries_per_table(), 2);

        // 12 + 5 * 9 = 57 bits, x86-64 five-level paging
        assert!(Geometry::new(5, 12).is_ok());

        // 4 + 60 * 1 = 64 bits exactly
        assert_eq!(Geometry::new(60, 4).unwrap().virtual_bits(), 64);
    }

    #[test]
    fn decomposes_address() {
        let g = Geometry::new(3, 12).unwrap();
        let va = VirtualAddress::new((5 << 30) | (7 << 21) | (9 << 12) | 0xABC);
        assert_eq!(g.page_offset(va), 0xABC);
        assert_eq!(g.level_index(va, 0).as_usize(), 9);
        assert_eq!(g.level_index(va, 1).as_usize(), 7);
        assert_eq!(g.level_index(va, 2).as_usize(), 5);
    }

    #[test]
    fn topmost_level_uses_full_word() {
        let g = Geometry::new(60, 4).unwrap();
        let va = VirtualAddress::new(1 << 63);
        assert_eq!(g.level_index(va, 59).as_usize(), 1);
        assert_eq!(g.level_index(va, 58).as_usize(), 0);
        assert!(g.is_valid(va));
    }

    #[test]
    fn every_address_is_valid_under_masking() {
        let g = Geometry::new(2, 10).unwrap();
        for raw in [0, 0x400, 0x4FF, 0xFF_FFFF, u64::MAX] {
            assert!(g.is_valid(VirtualAddress::new(raw)));
        }
    }

    #[test]
    fn configured_matches_build_constants() {
        assert_eq!(Geometry::CONFIGURED.levels(), mlpt_info::LEVELS);
        assert_eq!(Geometry::CONFIGURED.pobits(), mlpt_info::POBITS);
        assert_eq!(
            Geometry::CONFIGURED.entries_per_table(),
            mlpt_info::ENTRIES_PER_TABLE
        );
    }
}
