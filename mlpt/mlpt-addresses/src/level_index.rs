use core::fmt;

/// Index into the page table at one level of a walk.
///
/// Produced by [`Geometry::level_index`](crate::Geometry::level_index), which
/// masks the value to the level's index width, so it is always below the
/// configured [`entries_per_table`](crate::Geometry::entries_per_table).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LevelIndex(usize);

impl LevelIndex {
    #[inline]
    #[must_use]
    pub const fn new(v: usize) -> Self {
        Self(v)
    }

    /// Return the index as `usize` for table access.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for LevelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
