//! Change notifications emitted after every successful reservation change.
//!
//! The model does not know who listens; a typical observer keeps address
//! mapping metadata (for instance a firmware memory map) in sync.

use crate::region::RegionFlags;

/// Kind of reservation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOp {
    Reserve,
    Free,
}

/// One reservation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub base: u64,
    pub size: u64,
    pub op: ChangeOp,
    /// Flags of the request; [`RegionFlags::NONE`] for frees.
    pub flags: RegionFlags,
}

/// Observer of reservation changes.
pub trait ChangeNotifier {
    /// Called once per successful reserve, allocation or free.
    fn notify(&mut self, event: &ChangeEvent);
}

/// Notifier that ignores every event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    #[inline]
    fn notify(&mut self, _event: &ChangeEvent) {}
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for &mut N {
    #[inline]
    fn notify(&mut self, event: &ChangeEvent) {
        (**self).notify(event);
    }
}
