//! The external refresh action the trigger loop drives.

use std::sync::Arc;

use crate::error::ActionError;

/// Something that can refresh/recompile on request and report whether it is
/// currently able to.
///
/// The trigger loop only ever reads the two status booleans; it never asks
/// why the action is busy or locked.
pub trait RecompileAction: Send + Sync + 'static {
    /// Requests a refresh. Must not block waiting for the refresh to finish.
    fn invoke(&self) -> Result<(), ActionError>;

    /// Returns `true` while an operation is in flight.
    fn is_busy(&self) -> bool;

    /// Returns whether starting an operation is currently forbidden.
    ///
    /// Actions that cannot answer keep the default, which reports
    /// [`ActionError::LockStateUnavailable`]; the trigger loop then treats the
    /// action as locked.
    fn is_locked(&self) -> Result<bool, ActionError> {
        Err(ActionError::LockStateUnavailable)
    }
}

impl<A: RecompileAction + ?Sized> RecompileAction for Arc<A> {
    fn invoke(&self) -> Result<(), ActionError> {
        (**self).invoke()
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn is_locked(&self) -> Result<bool, ActionError> {
        (**self).is_locked()
    }
}

impl<A: RecompileAction + ?Sized> RecompileAction for Box<A> {
    fn invoke(&self) -> Result<(), ActionError> {
        (**self).invoke()
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn is_locked(&self) -> Result<bool, ActionError> {
        (**self).is_locked()
    }
}
