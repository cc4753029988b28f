use bitfield_struct::bitfield;
use mlpt_addresses::{Geometry, PhysicalAddress};

/// A single page table entry (PTE) in its raw word form.
///
/// ### Bit layout
///
/// | Bits            | Meaning |
/// |-----------------|---------|
/// | 0               | `valid`: the entry references a table or page |
/// | 1 ..= P-1       | reserved, always zero |
/// | P ..= 63        | physical base of the referenced table or page |
///
/// `P` is the geometry's `pobits`, so the boundary between reserved bits and
/// the base address moves with the configured page size. Because of that
/// the base is not a bitfield member; it is read and written through
/// [`base`](Self::base) and [`link`](Self::link) with the geometry at hand.
///
/// An entry with `valid` clear is absent, whatever its other bits say.
///
/// ### Example
/// ```rust
/// # use mlpt_vmem::{Geometry, PageTableEntry, PhysicalAddress};
/// let geometry = Geometry::new(2, 10).unwrap();
/// let e = PageTableEntry::link(PhysicalAddress::new(0x7400), geometry);
/// assert!(e.valid());
/// assert_eq!(e.into_bits(), 0x7401);
/// assert_eq!(e.base(geometry), Some(PhysicalAddress::new(0x7400)));
/// ```
#[doc(alias = "PTE")]
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    /// Valid (bit 0).
    pub valid: bool,

    /// Reserved bits followed by the base address; split by the geometry.
    #[bits(63)]
    __reserved_and_base: u64,
}

impl PageTableEntry {
    /// The absent entry: all bits zero.
    pub const INVALID: Self = Self::new();

    /// Build a valid entry pointing at `base`.
    ///
    /// ### Debug assertions
    /// - Asserts `base` is aligned to the geometry's page size.
    #[inline]
    #[must_use]
    pub const fn link(base: PhysicalAddress, geometry: Geometry) -> Self {
        debug_assert!(base.is_aligned(geometry.page_size()));
        Self::from_bits(base.as_u64() & geometry.page_mask()).with_valid(true)
    }

    /// The referenced base address, or `None` if the entry is not valid.
    #[inline]
    #[must_use]
    pub const fn base(self, geometry: Geometry) -> Option<PhysicalAddress> {
        if !self.valid() {
            return None;
        }
        Some(PhysicalAddress::new(self.into_bits() & geometry.page_mask()))
    }

    /// The reserved bits `1 ..= pobits - 1`. Zero for every entry the engine writes.
    #[inline]
    #[must_use]
    pub const fn reserved(self, geometry: Geometry) -> u64 {
        self.into_bits() & geometry.offset_mask() & !1
    }
}
