//! Error types for the br-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while starting or stopping a change listener.

use camino::Utf8PathBuf;

/// Errors that can occur during change listening.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - the listener cannot run
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - root must exist
/// - **Not a directory** ([`WatchError::NotADirectory`]): Fatal - root must be a directory
/// - **Invalid filter** ([`WatchError::InvalidFilter`]): Fatal - fix the configuration
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip the event
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use br_watcher::WatchError;
///
/// fn handle_error(err: WatchError) {
///     if err.is_fatal() {
///         eprintln!("Cannot watch: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watch root does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The watch root exists but is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// The extension filter pattern cannot be interpreted.
    #[error("invalid extension filter '{pattern}': {reason}")]
    InvalidFilter {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns `true` if this error only affects a single event.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if this error prevents the listener from running.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the watch root associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::NotADirectory(path) => Some(path),
            Self::Notify(_) | Self::InvalidFilter { .. } | Self::NonUtf8Path(_) | Self::Io(_) => {
                None
            }
        }
    }
}
