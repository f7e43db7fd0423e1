//! The coalescing "a trigger is pending" flag.
//!
//! # Thread Safety
//!
//! The flag is raised from the notify thread and read/cleared from the host
//! tick. Raising uses `AcqRel` and reading uses `Acquire`, so a raise is
//! always visible to the next tick that loads the flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared single-bit "something relevant changed" marker.
///
/// Any number of raises between two reads collapse into one `true`; the flag
/// carries no count and no event identity. Clones share the same bit.
///
/// # Examples
///
/// ```
/// use br_watcher::PendingFlag;
///
/// let flag = PendingFlag::new();
/// let listener_side = flag.clone();
///
/// listener_side.raise();
/// listener_side.raise();
///
/// assert!(flag.take());
/// assert!(!flag.is_raised());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PendingFlag {
    inner: Arc<AtomicBool>,
}

impl PendingFlag {
    /// Creates a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Returns `true` if it was previously lowered.
    #[inline]
    pub fn raise(&self) -> bool {
        !self.inner.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` if the flag is raised.
    #[inline]
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Lowers the flag.
    #[inline]
    pub fn clear(&self) {
        self.inner.store(false, Ordering::Release);
    }

    /// Lowers the flag, returning whether it was raised.
    #[inline]
    pub fn take(&self) -> bool {
        self.inner.swap(false, Ordering::AcqRel)
    }
}
