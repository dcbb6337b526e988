//! # Table Sizing and Flag Policy
//!
//! The region tables are sized once, when the model is built, and never grow
//! afterwards. The defaults below mirror the usual firmware configuration of
//! a handful of DRAM banks and a few dozen reservations.

use crate::region_set::FlagPolicy;

/// Default number of entries in the `available` (memory bank) table.
pub const DEFAULT_MEMORY_REGIONS: usize = 8;

/// Default number of entries in the `reserved` table.
pub const DEFAULT_RESERVED_REGIONS: usize = 16;

const _: () = {
    assert!(DEFAULT_MEMORY_REGIONS > 0);
    // an interior free splits one entry into two
    assert!(DEFAULT_RESERVED_REGIONS >= 2);
};

/// Sizing and merge policy of a [`MemoryModel`](crate::MemoryModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LmbConfig {
    /// Capacity of the `available` table.
    pub memory_regions: usize,
    /// Capacity of the `reserved` table.
    pub reserved_regions: usize,
    /// Overlap rule applied to the `reserved` table.
    pub flag_policy: FlagPolicy,
}

impl LmbConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            memory_regions: DEFAULT_MEMORY_REGIONS,
            reserved_regions: DEFAULT_RESERVED_REGIONS,
            flag_policy: FlagPolicy::DEFAULT,
        }
    }

    #[must_use]
    pub const fn with_memory_regions(mut self, memory_regions: usize) -> Self {
        self.memory_regions = memory_regions;
        self
    }

    #[must_use]
    pub const fn with_reserved_regions(mut self, reserved_regions: usize) -> Self {
        self.reserved_regions = reserved_regions;
        self
    }

    #[must_use]
    pub const fn with_flag_policy(mut self, flag_policy: FlagPolicy) -> Self {
        self.flag_policy = flag_policy;
        self
    }
}

impl Default for LmbConfig {
    fn default() -> Self {
        Self::new()
    }
}
