//! Error taxonomy shared by [`RegionSet`](crate::RegionSet) and
//! [`MemoryModel`](crate::MemoryModel).

/// Failure of a region table operation.
///
/// None of these are fatal: boot code decides whether to report and continue
/// or to give up. A failed operation never leaves a table partially modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LmbError {
    /// The table already holds its maximum number of entries and the
    /// operation would need one more.
    #[error("region table is full ({capacity} entries)")]
    CapacityExceeded { capacity: usize },
    /// The range overlaps an existing region with incompatible flags.
    #[error("range 0x{base:x}+0x{size:x} conflicts with an existing region")]
    Conflict { base: u64, size: u64 },
    /// No single region contains the range.
    #[error("no region contains 0x{base:x}+0x{size:x}")]
    NotFound { base: u64, size: u64 },
    /// A fixed-address request does not lie within a single memory bank.
    #[error("range 0x{base:x}+0x{size:x} does not fit in a single memory bank")]
    OutOfRange { base: u64, size: u64 },
    /// `base + size` wraps around the 64-bit address space.
    #[error("range 0x{base:x}+0x{size:x} overflows the address space")]
    InvalidRange { base: u64, size: u64 },
}

impl LmbError {
    /// Whether this error is a flag or overlap conflict.
    #[inline]
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
