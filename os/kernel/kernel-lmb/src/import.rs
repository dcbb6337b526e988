//! # Firmware Reservation Import
//!
//! Helpers that translate firmware-provided reservation lists into
//! [`MemoryModel::reserve`] calls:
//!
//! - UEFI memory maps: every descriptor that is not conventional memory is
//!   in use by firmware, the loader or devices and must stay reserved.
//! - Device-tree `/reserved-memory` and `/memreserve/` entries, already parsed
//!   into [`DtReservation`]s by the caller.
//!
//! Both stop at the first failing entry and return the number of
//! reservations applied so far otherwise.

use crate::error::LmbError;
use crate::model::MemoryModel;
use crate::notify::ChangeNotifier;
use crate::region::RegionFlags;
use log::{debug, warn};
use uefi::mem::memory_map::{MemoryDescriptor, MemoryType};

/// Size of a UEFI page, the unit of [`MemoryDescriptor::page_count`].
pub const UEFI_PAGE_SIZE: u64 = 4096;

/// One reserved range taken from a flattened device tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtReservation {
    pub base: u64,
    pub size: u64,
    /// The node carries the `no-map` property.
    pub no_map: bool,
}

impl DtReservation {
    #[must_use]
    pub const fn new(base: u64, size: u64, no_map: bool) -> Self {
        Self { base, size, no_map }
    }

    const fn flags(&self) -> RegionFlags {
        if self.no_map {
            RegionFlags::NO_MAP
        } else {
            RegionFlags::NONE
        }
    }
}

/// Reserve every non-conventional range of a UEFI memory map.
///
/// `RESERVED` descriptors become `no_map` reservations, every other type an
/// ordinary one. Empty descriptors are skipped.
///
/// # Errors
/// Returns the first [`MemoryModel::reserve`] failure, or
/// [`LmbError::InvalidRange`] if a descriptor's byte size overflows.
pub fn reserve_efi_memory_map<'a, N, I>(
    model: &mut MemoryModel<N>,
    descriptors: I,
) -> Result<usize, LmbError>
where
    N: ChangeNotifier,
    I: IntoIterator<Item = &'a MemoryDescriptor>,
{
    let mut applied = 0;
    for desc in descriptors {
        if desc.ty == MemoryType::CONVENTIONAL || desc.page_count == 0 {
            continue;
        }

        let base = desc.phys_start;
        let size = desc
            .page_count
            .checked_mul(UEFI_PAGE_SIZE)
            .ok_or(LmbError::InvalidRange {
                base,
                size: desc.page_count,
            })?;
        let flags = if desc.ty == MemoryType::RESERVED {
            RegionFlags::NO_MAP
        } else {
            RegionFlags::NONE
        };

        if let Err(err) = model.reserve(base, size, flags) {
            warn!("EFI {:?} range 0x{base:x}+0x{size:x} not reserved: {err}", desc.ty);
            return Err(err);
        }
        applied += 1;
    }

    debug!("reserved {applied} EFI memory map ranges");
    Ok(applied)
}

/// Reserve every non-empty device-tree reservation.
///
/// # Errors
/// Returns the first [`MemoryModel::reserve`] failure.
pub fn reserve_device_tree<N, I>(model: &mut MemoryModel<N>, entries: I) -> Result<usize, LmbError>
where
    N: ChangeNotifier,
    I: IntoIterator<Item = DtReservation>,
{
    let mut applied = 0;
    for entry in entries.into_iter().filter(|e| e.size != 0) {
        if let Err(err) = model.reserve(entry.base, entry.size, entry.flags()) {
            warn!(
                "device tree range 0x{:x}+0x{:x} not reserved: {err}",
                entry.base, entry.size
            );
            return Err(err);
        }
        applied += 1;
    }

    debug!("reserved {applied} device tree ranges");
    Ok(applied)
}
