//! Debounced change listener that arms a shared pending flag.
//!
//! This crate detects relevant file changes via the `notify` crate, with
//! debouncing through `notify-debouncer-mini`, and reduces them to a single
//! bit: [`PendingFlag`]. Whoever owns the other end of the flag decides when
//! (and whether) to act on it.
//!
//! # Overview
//!
//! - [`ChangeListener`] watches a root directory, filtered by a [`FileFilter`]
//! - [`ExtensionFilter`] parses patterns such as `*.cs` or `*.rs, *.toml`
//! - [`PendingFlag`] coalesces any number of changes into one pending trigger
//!
//! # Crate Dependencies
//!
//! ```text
//! br-cli ──► br-trigger ──► br-watcher ──► br-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use br_core::WatchConfig;
//! use br_watcher::{ChangeListener, ExtensionFilter, PendingFlag};
//!
//! # fn example() -> Result<(), br_watcher::WatchError> {
//! let config = WatchConfig::new("./src").with_extension_filter("*.rs");
//! let flag = PendingFlag::new();
//!
//! let listener = ChangeListener::start(
//!     &config,
//!     ExtensionFilter::from_pattern(&config.extension_filter)?,
//!     flag.clone(),
//! )?;
//!
//! // Any number of saves later...
//! if flag.take() {
//!     println!("time to rebuild");
//! }
//!
//! listener.stop()?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod filter;
pub mod listener;
pub mod pending;

pub use error::WatchError;
pub use filter::{AcceptAllFilter, ExtensionFilter, FileFilter};
pub use listener::ChangeListener;
pub use pending::PendingFlag;
