//! # Bounded Sorted Region Table
//!
//! [`RegionSet`] keeps a list of [`Region`]s that is, after every operation:
//!
//! - sorted ascending by base address,
//! - pairwise non-overlapping,
//! - free of adjacent entries with identical flags (those are coalesced),
//! - no longer than the capacity fixed at construction.
//!
//! Every mutating operation either restores these invariants or fails with an
//! [`LmbError`] and leaves the table exactly as it was.
//!
//! ```text
//!   insert [B, E) ──► contained in one entry?    ──► no-op / Conflict
//!                 └─► touching/overlapping run?  ──► coalesce into one entry
//!                 └─► otherwise                  ──► sorted insert (capacity check)
//! ```

use crate::error::LmbError;
use crate::region::{Region, RegionFlags};
use alloc::vec::Vec;
use core::slice;
use log::trace;

/// How an incoming range is treated when it overlaps regions with different flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagPolicy {
    /// An incoming [`RegionFlags::NONE`] range absorbs the differently flagged
    /// regions it overlaps; the merged entry keeps their flags. Any other
    /// mismatch is a conflict.
    Legacy,
    /// Every flag mismatch on overlap is a conflict.
    Strict,
}

impl FlagPolicy {
    /// Build-time default, [`Strict`](Self::Strict) with the `strict-flags` feature.
    #[cfg(not(feature = "strict-flags"))]
    pub const DEFAULT: Self = Self::Legacy;

    /// Build-time default, [`Strict`](Self::Strict) with the `strict-flags` feature.
    #[cfg(feature = "strict-flags")]
    pub const DEFAULT: Self = Self::Strict;
}

impl Default for FlagPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sorted, non-overlapping, capacity-bounded table of regions.
///
/// The backing storage is allocated once in [`RegionSet::new`] and never
/// grows: an operation that would need more than `capacity` entries fails
/// with [`LmbError::CapacityExceeded`].
#[derive(Debug)]
pub struct RegionSet {
    regions: Vec<Region>,
    capacity: usize,
    policy: FlagPolicy,
}

impl RegionSet {
    /// Create an empty table for at most `capacity` regions using the default policy.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, FlagPolicy::default())
    }

    #[must_use]
    pub fn with_policy(capacity: usize, policy: FlagPolicy) -> Self {
        Self {
            regions: Vec::with_capacity(capacity),
            capacity,
            policy,
        }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub const fn policy(&self) -> FlagPolicy {
        self.policy
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.regions.len() == self.capacity
    }

    /// The regions in ascending address order.
    #[inline]
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Region> {
        self.regions.iter()
    }

    /// Sum of all region sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.regions.iter().map(Region::size).sum()
    }

    /// Drop every region; capacity and policy are kept.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Insert `[base, base + size)` with `flags`, coalescing with neighbors.
    ///
    /// Returns how many existing entries were merged into the new range
    /// (`0` for a plain insert or a no-op). A zero-sized range is accepted
    /// and stores nothing.
    ///
    /// # Errors
    /// - [`LmbError::InvalidRange`] if the range wraps around the address space.
    /// - [`LmbError::Conflict`] if the range overlaps regions with incompatible flags.
    /// - [`LmbError::CapacityExceeded`] if a new entry is needed and the table is full.
    pub fn insert_flagged(
        &mut self,
        base: u64,
        size: u64,
        flags: RegionFlags,
    ) -> Result<usize, LmbError> {
        if size == 0 {
            return Ok(0);
        }
        let end = checked_end(base, size)?;

        if self.regions.is_empty() {
            self.insert_at(0, Region::new(base, size, flags))?;
            trace!("insert 0x{base:x}+0x{size:x} ({flags}) into empty table");
            return Ok(0);
        }

        if let Some(existing) = self.regions.iter().find(|r| r.contains_range(base, end)) {
            return if existing.flags() == flags {
                Ok(0)
            } else {
                Err(LmbError::Conflict { base, size })
            };
        }

        // Everything overlapping or touching [base, end) is one contiguous run.
        let first = self.regions.partition_point(|r| r.end() < base);
        let last = self.regions.partition_point(|r| r.base() <= end);
        let run = &self.regions[first..last];

        let target = self.merged_flags(run, base, end, flags)?;
        let Some(lo) = run.iter().position(|r| r.flags() == target) else {
            let at = self.regions.partition_point(|r| r.base() < base);
            self.insert_at(at, Region::new(base, size, flags))?;
            trace!("insert 0x{base:x}+0x{size:x} ({flags}) at index {at}");
            return Ok(0);
        };
        let hi = run
            .iter()
            .rposition(|r| r.flags() == target)
            .unwrap_or(lo);
        let (lo, hi) = (first + lo, first + hi + 1);

        let merged_base = base.min(self.regions[lo].base());
        let merged_end = end.max(self.regions[hi - 1].end());
        self.regions[lo] = Region::new(merged_base, merged_end - merged_base, target);
        self.regions.drain(lo + 1..hi);

        trace!(
            "insert 0x{base:x}+0x{size:x} ({flags}) coalesced {} entries into {}",
            hi - lo,
            self.regions[lo]
        );
        debug_assert!(self.is_well_formed());
        Ok(hi - lo)
    }

    /// Flags the coalesced entry will carry, or a conflict.
    ///
    /// Only the entries that actually overlap `[base, end)` decide; merely
    /// touching entries with other flags simply stay separate.
    fn merged_flags(
        &self,
        run: &[Region],
        base: u64,
        end: u64,
        flags: RegionFlags,
    ) -> Result<RegionFlags, LmbError> {
        let conflict = LmbError::Conflict {
            base,
            size: end - base,
        };
        let absorbs = self.policy == FlagPolicy::Legacy && flags.is_none();

        let mut target = None;
        for region in run.iter().filter(|r| r.overlaps(base, end)) {
            if region.flags() != flags && !absorbs {
                return Err(conflict);
            }
            if target.is_some_and(|t| t != region.flags()) {
                return Err(conflict);
            }
            target = Some(region.flags());
        }
        Ok(target.unwrap_or(flags))
    }

    /// Remove `[base, base + size)`, which must lie within a single region.
    ///
    /// Trims the region from either end, deletes it on an exact match, or
    /// splits it in two when the range is strictly interior. A zero-sized
    /// range is a no-op.
    ///
    /// # Errors
    /// - [`LmbError::InvalidRange`] if the range wraps around the address space.
    /// - [`LmbError::NotFound`] if no single region contains the range.
    /// - [`LmbError::CapacityExceeded`] if a split needs a new entry and the table is full.
    pub fn remove_range(&mut self, base: u64, size: u64) -> Result<(), LmbError> {
        if size == 0 {
            return Ok(());
        }
        let end = checked_end(base, size)?;

        let index = self
            .regions
            .iter()
            .position(|r| r.contains_range(base, end))
            .ok_or(LmbError::NotFound { base, size })?;
        let region = self.regions[index];

        if region.base() == base && region.end() == end {
            self.regions.remove(index);
        } else if region.base() == base {
            self.regions[index].set_span(end, region.end());
        } else if region.end() == end {
            self.regions[index].set_span(region.base(), base);
        } else {
            let tail = Region::new(end, region.end() - end, region.flags());
            self.insert_at(index + 1, tail)?;
            self.regions[index].set_span(region.base(), base);
        }

        trace!("remove 0x{base:x}+0x{size:x} from {region}");
        debug_assert!(self.is_well_formed());
        Ok(())
    }

    /// Index of the first region sharing at least one byte with `[base, base + size)`.
    #[must_use]
    pub fn find_overlap(&self, base: u64, size: u64) -> Option<usize> {
        if size == 0 {
            return None;
        }
        let end = base.saturating_add(size);
        self.regions.iter().position(|r| r.overlaps(base, end))
    }

    /// Index of the region containing `addr`.
    #[must_use]
    pub fn find_containing(&self, addr: u64) -> Option<usize> {
        self.regions.iter().position(|r| r.contains_addr(addr))
    }

    /// Check the table invariants.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.regions.len() <= self.capacity
            && self.regions.iter().all(|r| r.size() > 0)
            && self.regions.windows(2).all(|pair| {
                let (a, b) = (pair[0], pair[1]);
                a.base() < b.base()
                    && a.end() <= b.base()
                    && !(a.end() == b.base() && a.flags() == b.flags())
            })
    }

    fn insert_at(&mut self, index: usize, region: Region) -> Result<(), LmbError> {
        if self.is_full() {
            return Err(LmbError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.regions.insert(index, region);
        Ok(())
    }
}

impl Clone for RegionSet {
    fn clone(&self) -> Self {
        // keep the full capacity reserved in the copy
        let mut regions = Vec::with_capacity(self.capacity);
        regions.extend_from_slice(&self.regions);
        Self {
            regions,
            capacity: self.capacity,
            policy: self.policy,
        }
    }
}

impl PartialEq for RegionSet {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity
            && self.policy == other.policy
            && self.regions == other.regions
    }
}

impl Eq for RegionSet {}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[inline]
const fn checked_end(base: u64, size: u64) -> Result<u64, LmbError> {
    match base.checked_add(size) {
        Some(end) => Ok(end),
        None => Err(LmbError::InvalidRange { base, size }),
    }
}
