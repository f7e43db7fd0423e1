//! Error types for the br-trigger crate.

use br_core::ConfigError;
use br_watcher::WatchError;
use thiserror::Error;

/// Errors reported by a [`RecompileAction`](crate::RecompileAction).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActionError {
    /// The action cannot tell whether it is locked.
    #[error("lock state is not available from this action")]
    LockStateUnavailable,

    /// The refresh could not be started.
    #[error("failed to start refresh: {0}")]
    Spawn(#[from] std::io::Error),

    /// The refresh was rejected for another reason.
    #[error("refresh failed: {0}")]
    Failed(String),
}

impl ActionError {
    /// Creates a new [`ActionError::Failed`].
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors that can occur while switching the recompiler on.
///
/// Switching off never fails; disposal problems are logged instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TriggerError {
    /// The change listener could not be started.
    #[error("change listener error: {0}")]
    Watch(#[from] WatchError),

    /// The worker constructing the listener panicked or was cancelled.
    #[error("listener construction worker failed: {0}")]
    Worker(String),

    /// The watch configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
