//! # Memory Model
//!
//! [`MemoryModel`] relates two [`RegionSet`]s:
//!
//! ```text
//!  available  ┌──────────── bank 0 ────────────┐      ┌──── bank 1 ────┐
//!  reserved        ├─ image ─┤   ├─ dtb ─┤                  ├─ stack ─┤
//!                                                  ◄── top-down search starts here
//! ```
//!
//! - `available` describes the memory banks found at boot and rarely changes.
//! - `reserved` describes sub-ranges of those banks that are claimed.
//!
//! Allocation searches banks from the highest one down and packs each new
//! block directly below the closest obstruction, so low memory is handed out
//! last. Every successful change of `reserved` is reported to the model's
//! [`ChangeNotifier`].
//!
//! Reservations overlapping an entry flagged
//! [`no_overwrite`](RegionFlags::no_overwrite) are always refused, whatever
//! their own flags.

use crate::config::LmbConfig;
use crate::error::LmbError;
use crate::notify::{ChangeEvent, ChangeNotifier, ChangeOp, NoopNotifier};
use crate::region::{Region, RegionFlags, align_down};
use crate::region_set::RegionSet;
use log::{debug, trace};

/// Physical memory banks and the reservations carved out of them.
#[derive(Debug, Clone)]
pub struct MemoryModel<N: ChangeNotifier = NoopNotifier> {
    available: RegionSet,
    reserved: RegionSet,
    notifier: N,
}

impl MemoryModel<NoopNotifier> {
    /// Model with default table sizes and no observer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LmbConfig::new(), NoopNotifier)
    }
}

impl Default for MemoryModel<NoopNotifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: ChangeNotifier> MemoryModel<N> {
    #[must_use]
    pub fn with_config(config: LmbConfig, notifier: N) -> Self {
        Self {
            available: RegionSet::with_policy(config.memory_regions, config.flag_policy),
            reserved: RegionSet::with_policy(config.reserved_regions, config.flag_policy),
            notifier,
        }
    }

    /// Model with default table sizes reporting to `notifier`.
    #[must_use]
    pub fn with_notifier(notifier: N) -> Self {
        Self::with_config(LmbConfig::new(), notifier)
    }

    #[inline]
    #[must_use]
    pub const fn available(&self) -> &RegionSet {
        &self.available
    }

    #[inline]
    #[must_use]
    pub const fn reserved(&self) -> &RegionSet {
        &self.reserved
    }

    #[inline]
    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    #[inline]
    pub const fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Total size of all memory banks.
    #[must_use]
    pub fn total_memory(&self) -> u64 {
        self.available.total_size()
    }

    /// Total size of all reservations.
    #[must_use]
    pub fn reserved_size(&self) -> u64 {
        self.reserved.total_size()
    }

    /// Forget all banks and reservations.
    pub fn reset(&mut self) {
        self.available.clear();
        self.reserved.clear();
        debug!("memory model reset");
    }

    /// Register a memory bank.
    ///
    /// # Errors
    /// Propagates [`RegionSet::insert_flagged`] failures of the `available` table.
    pub fn add_memory(&mut self, base: u64, size: u64) -> Result<(), LmbError> {
        self.available
            .insert_flagged(base, size, RegionFlags::NONE)?;
        trace!("memory bank 0x{base:x}+0x{size:x} added");
        Ok(())
    }

    /// Register every `(base, size)` bank in order, skipping empty banks.
    ///
    /// # Errors
    /// Stops at and returns the first [`add_memory`](Self::add_memory) failure.
    pub fn add_memory_banks<I>(&mut self, banks: I) -> Result<(), LmbError>
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        banks
            .into_iter()
            .filter(|&(_, size)| size != 0)
            .try_for_each(|(base, size)| self.add_memory(base, size))
    }

    /// Reserve `[base, base + size)` with `flags`.
    ///
    /// The range is not checked against the memory banks.
    ///
    /// # Errors
    /// - [`LmbError::Conflict`] on a flag conflict or an overlap with a
    ///   `no_overwrite` reservation.
    /// - Any other [`RegionSet::insert_flagged`] failure.
    pub fn reserve(&mut self, base: u64, size: u64, flags: RegionFlags) -> Result<(), LmbError> {
        self.check_overwrite(base, size)?;
        self.reserved.insert_flagged(base, size, flags)?;
        self.emit(ChangeOp::Reserve, base, size, flags);
        Ok(())
    }

    /// Release `[base, base + size)`, which must lie within one reservation.
    ///
    /// # Errors
    /// Propagates [`RegionSet::remove_range`] failures.
    pub fn free(&mut self, base: u64, size: u64) -> Result<(), LmbError> {
        self.reserved.remove_range(base, size)?;
        self.emit(ChangeOp::Free, base, size, RegionFlags::NONE);
        Ok(())
    }

    /// Allocate `size` bytes anywhere, as high as possible.
    #[must_use]
    pub fn alloc(&mut self, size: u64, align: u64) -> Option<u64> {
        self.alloc_top_down(size, align, None)
    }

    /// Allocate `size` bytes ending at or below `max_addr`, as high as possible.
    #[must_use]
    pub fn alloc_below(&mut self, size: u64, align: u64, max_addr: u64) -> Option<u64> {
        self.alloc_top_down(size, align, Some(max_addr))
    }

    /// Top-down search for a free, `align`ed block of `size` bytes.
    ///
    /// With `max_addr`, the block ends at or below it. Returns the base of the
    /// new reservation, or `None` if no bank has room.
    #[must_use]
    pub fn alloc_top_down(&mut self, size: u64, align: u64, max_addr: Option<u64>) -> Option<u64> {
        self.alloc_top_down_flagged(size, align, max_addr, RegionFlags::NONE)
    }

    /// [`alloc_top_down`](Self::alloc_top_down) with explicit reservation flags.
    ///
    /// `align == 0` means no alignment; other alignments must be powers of two.
    /// Address `0` is never returned.
    #[must_use]
    pub fn alloc_top_down_flagged(
        &mut self,
        size: u64,
        align: u64,
        max_addr: Option<u64>,
        flags: RegionFlags,
    ) -> Option<u64> {
        let align = align.max(1);
        if size == 0 || !align.is_power_of_two() {
            debug!("alloc of 0x{size:x} bytes with alignment 0x{align:x} rejected");
            return None;
        }

        for index in (0..self.available.len()).rev() {
            let bank = self.available.regions()[index];
            if bank.size() < size {
                continue;
            }
            let top = match max_addr {
                None => bank.end(),
                Some(max) if bank.base() >= max => continue,
                Some(max) => bank.end().min(max),
            };
            let Some(highest) = top.checked_sub(size) else {
                continue;
            };

            let mut candidate = align_down(highest, align);
            while candidate >= bank.base() && candidate != 0 {
                let Some(blocker) = self.reserved.find_overlap(candidate, size) else {
                    return self.claim(candidate, size, flags);
                };
                let Some(below) = self.reserved.regions()[blocker].base().checked_sub(size) else {
                    break;
                };
                candidate = align_down(below, align);
            }
        }

        debug!("no room for 0x{size:x} bytes (align 0x{align:x}, max {max_addr:x?})");
        None
    }

    fn claim(&mut self, base: u64, size: u64, flags: RegionFlags) -> Option<u64> {
        match self.reserved.insert_flagged(base, size, flags) {
            Ok(_) => {
                self.emit(ChangeOp::Reserve, base, size, flags);
                debug!("allocated 0x{base:x}+0x{size:x} ({flags})");
                Some(base)
            }
            Err(err) => {
                debug!("allocation at 0x{base:x}+0x{size:x} not recorded: {err}");
                None
            }
        }
    }

    /// Reserve exactly `[base, base + size)`, which must be unreserved memory
    /// inside a single bank.
    ///
    /// # Errors
    /// See [`alloc_at_flagged`](Self::alloc_at_flagged).
    pub fn alloc_at(&mut self, base: u64, size: u64) -> Result<u64, LmbError> {
        self.alloc_at_flagged(base, size, RegionFlags::NONE)
    }

    /// [`alloc_at`](Self::alloc_at) with explicit reservation flags.
    ///
    /// # Errors
    /// - [`LmbError::InvalidRange`] if the range wraps around the address space.
    /// - [`LmbError::OutOfRange`] if the range is empty or not inside one bank.
    /// - [`LmbError::Conflict`] if any part of it is already reserved.
    /// - [`LmbError::CapacityExceeded`] if the reservation table is full.
    pub fn alloc_at_flagged(
        &mut self,
        base: u64,
        size: u64,
        flags: RegionFlags,
    ) -> Result<u64, LmbError> {
        let end = base
            .checked_add(size)
            .ok_or(LmbError::InvalidRange { base, size })?;
        if size == 0 || !self.available.iter().any(|bank| bank.contains_range(base, end)) {
            return Err(LmbError::OutOfRange { base, size });
        }
        if self.reserved.find_overlap(base, size).is_some() {
            return Err(LmbError::Conflict { base, size });
        }

        self.reserved.insert_flagged(base, size, flags)?;
        self.emit(ChangeOp::Reserve, base, size, flags);
        Ok(base)
    }

    /// Reserve the running firmware's stack and everything above it.
    ///
    /// Starting `guard` bytes below `sp`, the range up to the end of the bank
    /// holding it (but not beyond `end`) is reserved `no_overwrite`. Nothing
    /// is reserved when `end` lies at or below that start.
    ///
    /// # Errors
    /// - [`LmbError::NotFound`] if no bank contains the start address.
    /// - Any [`reserve`](Self::reserve) failure.
    pub fn reserve_stack(&mut self, sp: u64, end: u64, guard: u64) -> Result<(), LmbError> {
        let start = sp.saturating_sub(guard);
        let bank_end = self
            .available
            .find_containing(start)
            .and_then(|index| self.available.get(index))
            .map(Region::end)
            .ok_or(LmbError::NotFound {
                base: start,
                size: 0,
            })?;

        let limit = bank_end.min(end);
        if limit <= start {
            return Ok(());
        }
        debug!("reserving stack area 0x{start:x}-0x{limit:x}");
        self.reserve(start, limit - start, RegionFlags::NO_OVERWRITE)
    }

    /// Number of free bytes starting at `addr`.
    ///
    /// Walks the reservations in address order: the first one above `addr`
    /// bounds the run, one containing `addr` yields `0`. With no reservation
    /// above `addr` the run extends to the end of the *last* bank, which
    /// assumes the banks are contiguous. Returns `0` when `addr` is not in
    /// any bank. See [`free_size_in_bank`](Self::free_size_in_bank) for the
    /// exact figure.
    #[must_use]
    pub fn free_size_from(&self, addr: u64) -> u64 {
        if self.available.find_containing(addr).is_none() {
            return 0;
        }

        for region in &self.reserved {
            if addr < region.base() {
                return region.base() - addr;
            }
            if region.end() > addr {
                return 0;
            }
        }

        self.available
            .regions()
            .last()
            .map_or(0, |bank| bank.end().saturating_sub(addr))
    }

    /// Number of free bytes starting at `addr`, bounded by the end of the
    /// bank that holds it.
    #[must_use]
    pub fn free_size_in_bank(&self, addr: u64) -> u64 {
        let Some(bank) = self
            .available
            .find_containing(addr)
            .and_then(|index| self.available.get(index))
        else {
            return 0;
        };
        if self.is_reserved(addr) {
            return 0;
        }

        let limit = self
            .reserved
            .iter()
            .map(Region::base)
            .find(|&base| base > addr)
            .map_or(bank.end(), |base| base.min(bank.end()));
        limit - addr
    }

    /// Whether `addr` lies in any reservation.
    #[must_use]
    pub fn is_reserved(&self, addr: u64) -> bool {
        self.reserved.find_containing(addr).is_some()
    }

    /// Whether `addr` lies in a reservation carrying every bit of `flags`.
    #[must_use]
    pub fn is_reserved_with_flags(&self, addr: u64, flags: RegionFlags) -> bool {
        self.reserved
            .iter()
            .any(|r| r.contains_addr(addr) && r.flags().contains(flags))
    }

    fn check_overwrite(&self, base: u64, size: u64) -> Result<(), LmbError> {
        let end = base.saturating_add(size);
        let protected = self
            .reserved
            .iter()
            .any(|r| r.flags().no_overwrite() && r.overlaps(base, end));
        if size != 0 && protected {
            return Err(LmbError::Conflict { base, size });
        }
        Ok(())
    }

    fn emit(&mut self, op: ChangeOp, base: u64, size: u64, flags: RegionFlags) {
        trace!("{op:?} 0x{base:x}+0x{size:x} ({flags})");
        self.notifier.notify(&ChangeEvent {
            base,
            size,
            op,
            flags,
        });
    }
}
