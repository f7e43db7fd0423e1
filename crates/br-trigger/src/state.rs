//! State shared between the lifecycle controller and the trigger loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use br_watcher::PendingFlag;

/// Whether the recompiler is switched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunState {
    /// No listener and no tick subscription.
    #[default]
    Disabled,
    /// A listener is running and the trigger loop is ticking.
    Enabled,
}

impl RunState {
    /// Returns `true` for [`RunState::Enabled`].
    #[inline]
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
        })
    }
}

/// The pending flag plus the run state, shared by reference count.
///
/// The lifecycle controller is the only writer of the run state; the
/// listener raises and the trigger loop clears the pending flag.
#[derive(Debug, Default)]
pub struct TriggerState {
    pending: PendingFlag,
    enabled: AtomicBool,
}

impl TriggerState {
    /// Creates a disabled state with a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pending flag.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &PendingFlag {
        &self.pending
    }

    /// Returns the current run state.
    #[inline]
    #[must_use]
    pub fn run_state(&self) -> RunState {
        if self.enabled.load(Ordering::Acquire) {
            RunState::Enabled
        } else {
            RunState::Disabled
        }
    }

    pub(crate) fn set_run_state(&self, state: RunState) {
        self.enabled.store(state.is_enabled(), Ordering::Release);
    }
}
