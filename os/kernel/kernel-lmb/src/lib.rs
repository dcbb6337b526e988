//! # Logical Memory Blocks
//!
//! Early-boot bookkeeping of physical memory: which ranges exist, which are
//! claimed, and where a new block of a given size and alignment can go. The
//! crate runs before any real allocator exists, so its tables are sized once
//! and never grow.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Memory Model                       │
//! │    • Top-down and fixed-address allocation          │
//! │    • Reserve / free with flag rules                 │
//! │    • Free-size and flag queries                     │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │
//! ┌──────────▼──────────┐       ┌──────────▼──────────┐
//! │  available (banks)  │       │  reserved (claims)  │
//! │     RegionSet       │       │     RegionSet       │
//! └─────────────────────┘       └──────────┬──────────┘
//!                                          │ every successful change
//!                               ┌──────────▼──────────┐
//!                               │   ChangeNotifier    │
//!                               └─────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Region Tables ([`region_set`])
//!
//! A [`RegionSet`] is a sorted, non-overlapping, capacity-bounded list of
//! [`Region`]s. Inserting a range coalesces it with every touching or
//! overlapping entry that has the same [`RegionFlags`]; removing a range may
//! shrink or split the entry that contains it. Failed operations leave the
//! table untouched.
//!
//! ### Memory Model ([`model`])
//!
//! A [`MemoryModel`] pairs the `available` and `reserved` tables:
//! - [`alloc_top_down`](MemoryModel::alloc_top_down) places blocks as high as
//!   possible, directly below the nearest obstruction.
//! - [`alloc_at`](MemoryModel::alloc_at) claims an exact, unreserved range.
//! - [`reserve`](MemoryModel::reserve) and [`free`](MemoryModel::free) edit the
//!   claims directly; `no_overwrite` claims refuse any later overlap.
//!
//! ### Firmware Import ([`import`])
//!
//! Turns UEFI memory maps and device-tree reservations into reservations.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_lmb::{MemoryModel, RegionFlags};
//!
//! let mut lmb = MemoryModel::new();
//! lmb.add_memory(0x4000_0000, 0x2000_0000)?;
//! lmb.reserve(0x5ff0_0000, 0x10_0000, RegionFlags::NO_MAP)?;
//!
//! let fdt = lmb.alloc(0x1_0000, 0x1000).expect("room for the device tree");
//! assert_eq!(fdt, 0x5fef_0000);
//! assert_eq!(lmb.free_size_from(0x4000_0000), 0x1fef_0000);
//! # Ok::<(), kernel_lmb::LmbError>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod config;
pub mod dump;
pub mod error;
pub mod import;
pub mod model;
pub mod notify;
pub mod region;
pub mod region_set;

pub use config::{DEFAULT_MEMORY_REGIONS, DEFAULT_RESERVED_REGIONS, LmbConfig};
pub use dump::TableDump;
pub use error::LmbError;
pub use import::{DtReservation, UEFI_PAGE_SIZE, reserve_device_tree, reserve_efi_memory_map};
pub use model::MemoryModel;
pub use notify::{ChangeEvent, ChangeNotifier, ChangeOp, NoopNotifier};
pub use region::{Region, RegionFlags};
pub use region_set::{FlagPolicy, RegionSet};
