//! # Regions and Region Flags
//!
//! A [`Region`] is one contiguous physical range `[base, base + size)` with a
//! homogeneous purpose, described by its [`RegionFlags`].

use bitfield_struct::bitfield;
use core::fmt;

/// Attribute bits attached to a region.
///
/// Layout (LSB→MSB):
/// - bit 0: `no_map`, the range must never be placed in a virtual mapping
/// - bit 1: `no_overwrite`, the range must not be re-claimed by a later request
/// - bits 2..31: reserved (zero)
///
/// Two regions only coalesce when their flags are bit-identical.
#[bitfield(u32)]
#[derive(PartialEq, Eq, Hash)]
pub struct RegionFlags {
    #[bits(1)]
    pub no_map: bool,
    #[bits(1)]
    pub no_overwrite: bool,
    #[bits(30)]
    __: u32,
}

impl RegionFlags {
    /// Ordinary reservation ("don't care").
    pub const NONE: Self = Self::new();
    /// Keep the range out of any later virtual mapping.
    pub const NO_MAP: Self = Self::new().with_no_map(true);
    /// Refuse any later overlapping claim.
    pub const NO_OVERWRITE: Self = Self::new().with_no_overwrite(true);

    /// `true` if no attribute bit is set.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.into_bits() == 0
    }

    /// `true` if every bit of `other` is also set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.into_bits() & other.into_bits() == other.into_bits()
    }

    /// Bitwise union of both flag sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self::from_bits(self.into_bits() | other.into_bits())
    }
}

impl fmt::Display for RegionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }

        let mut sep = "";
        if self.no_map() {
            f.write_str("no-map")?;
            sep = "|";
        }
        if self.no_overwrite() {
            write!(f, "{sep}no-overwrite")?;
        }
        Ok(())
    }
}

/// A contiguous physical address range with attached flags.
///
/// Regions stored in a [`RegionSet`](crate::RegionSet) always have a nonzero
/// size and an end that does not wrap around the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    base: u64,
    size: u64,
    flags: RegionFlags,
}

impl Region {
    #[inline]
    #[must_use]
    pub const fn new(base: u64, size: u64, flags: RegionFlags) -> Self {
        Self { base, size, flags }
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> RegionFlags {
        self.flags
    }

    /// Exclusive end address (`base + size`).
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Inclusive last address, as printed in dumps.
    #[inline]
    #[must_use]
    pub const fn last(&self) -> u64 {
        self.base + self.size - 1
    }

    /// Whether `addr` lies inside the region.
    #[inline]
    #[must_use]
    pub const fn contains_addr(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// Whether `[base, end)` lies entirely inside the region.
    #[inline]
    #[must_use]
    pub const fn contains_range(&self, base: u64, end: u64) -> bool {
        self.base <= base && end <= self.end()
    }

    /// Whether the region shares at least one byte with `[base, end)`.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, base: u64, end: u64) -> bool {
        base < self.end() && self.base < end
    }

    /// Whether `[base, end)` ends exactly where the region begins or begins
    /// exactly where it ends.
    #[inline]
    #[must_use]
    pub const fn touches(&self, base: u64, end: u64) -> bool {
        end == self.base || base == self.end()
    }

    pub(crate) const fn set_span(&mut self, base: u64, end: u64) {
        self.base = base;
        self.size = end - base;
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[0x{:x}-0x{:x}], 0x{:08x} bytes, flags: {}",
            self.base,
            self.last(),
            self.size,
            self.flags
        )
    }
}

/// Round `addr` down to a multiple of `align` (a power of two).
#[inline]
pub(crate) const fn align_down(addr: u64, align: u64) -> u64 {
    addr & !(align - 1)
}
