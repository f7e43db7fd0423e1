//! The change listener.
//!
//! [`ChangeListener`] owns a debounced `notify` watcher whose callback does
//! exactly one thing: raise the shared [`PendingFlag`] when a relevant path
//! changed. It never calls the recompile action itself.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  notify / debouncer threads                       │
//! │  ┌───────────────────┐    ┌────────────────┐    ┌─────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Debouncer      │ -> │ Callback    │  │
//! │  │ (notify)          │    │ (debounce_ms)  │    │ (filtering) │  │
//! │  └───────────────────┘    └────────────────┘    └──────┬──────┘  │
//! └─────────────────────────────────────────────────────────│────────┘
//!                                                           │ read lock
//!                                                           ▼
//!                                          Sink { RwLock<Option<PendingFlag>> }
//!                                                           │ raise()
//!                                                           ▼
//!                                        PendingFlag (read by the host tick)
//! ```
//!
//! # Stopping
//!
//! [`ChangeListener::stop`] first detaches the sink under its write lock and
//! only then releases the OS watcher. A callback already running either
//! finishes its raise before the detach completes or sees the sink empty, so
//! once `stop` returns no late event can raise the flag.

use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use br_core::WatchConfig;

use crate::error::WatchError;
use crate::filter::FileFilter;
use crate::pending::PendingFlag;

/// Where the notify callback delivers relevant changes.
#[derive(Debug)]
struct Sink {
    flag: RwLock<Option<PendingFlag>>,
}

impl Sink {
    fn new(flag: PendingFlag) -> Self {
        Self {
            flag: RwLock::new(Some(flag)),
        }
    }

    /// Raises the flag if still attached. Returns `false` once detached.
    fn deliver(&self) -> bool {
        match self.flag.read().as_ref() {
            Some(flag) => {
                flag.raise();
                true
            }
            None => false,
        }
    }

    fn detach(&self) -> Option<PendingFlag> {
        self.flag.write().take()
    }

    fn is_attached(&self) -> bool {
        self.flag.read().is_some()
    }
}

/// A running, debounced filesystem listener.
///
/// # Lifecycle
///
/// 1. **Start**: [`ChangeListener::start`] validates the root, builds the
///    debouncer and registers the watch. Registering a recursive watch walks
///    the directory tree, so callers on a latency-sensitive thread should
///    run it on a blocking worker.
/// 2. **Running**: relevant changes raise the shared flag.
/// 3. **Stop**: [`ChangeListener::stop`] or dropping the listener detaches
///    the callback and releases the watcher.
///
/// # Examples
///
/// ```no_run
/// use br_core::WatchConfig;
/// use br_watcher::{ChangeListener, ExtensionFilter, PendingFlag};
///
/// # fn example() -> Result<(), br_watcher::WatchError> {
/// let config = WatchConfig::new("./Assets").with_extension_filter("*.cs");
/// let filter = ExtensionFilter::from_pattern(&config.extension_filter)?;
/// let flag = PendingFlag::new();
///
/// let listener = ChangeListener::start(&config, filter, flag.clone())?;
/// // ... later, on the tick thread:
/// if flag.take() {
///     // refresh
/// }
/// listener.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct ChangeListener {
    /// The debounced watcher. `None` once stopped.
    debouncer: Option<Debouncer<notify::RecommendedWatcher>>,

    /// Shared with the notify callback.
    sink: Arc<Sink>,

    /// Canonical watch root.
    watch_path: Utf8PathBuf,

    recursive: bool,
}

impl std::fmt::Debug for ChangeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListener")
            .field("watch_path", &self.watch_path)
            .field("recursive", &self.recursive)
            .field("is_attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl ChangeListener {
    /// Starts listening under `config.root_path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] or [`WatchError::NotADirectory`]
    /// for a bad root, [`WatchError::Io`] if it cannot be canonicalized, and
    /// [`WatchError::Notify`] if the OS watcher cannot be created.
    pub fn start<F: FileFilter>(
        config: &WatchConfig,
        filter: F,
        flag: PendingFlag,
    ) -> Result<Self, WatchError> {
        let started = Instant::now();
        let root = &config.root_path;

        if !root.exists() {
            return Err(WatchError::path_not_found(root.clone()));
        }
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root.clone()));
        }

        let watch_path = root.canonicalize_utf8()?;

        let sink = Arc::new(Sink::new(flag));
        let callback_sink = Arc::clone(&sink);

        let mut debouncer = new_debouncer(
            Duration::from_millis(config.debounce_ms),
            move |res: DebounceEventResult| handle_batch(res, &filter, &callback_sink),
        )?;

        let mode = if config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        debouncer.watcher().watch(watch_path.as_std_path(), mode)?;

        info!(path = %watch_path, recursive = config.recursive, "Change listener started");
        debug!(
            elapsed_ms = started.elapsed().as_millis(),
            "Change listener constructed"
        );

        Ok(Self {
            debouncer: Some(debouncer),
            sink,
            watch_path,
            recursive: config.recursive,
        })
    }

    /// Returns the canonical path being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` while events can still reach the pending flag.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.sink.is_attached()
    }

    /// Stops listening.
    ///
    /// The callback is detached before the watcher is released. The watcher
    /// is released even when unregistering the watch fails.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Notify`] if the OS refused to remove the watch
    /// (for example because the root was deleted while watching).
    pub fn stop(mut self) -> Result<(), WatchError> {
        self.sink.detach();

        let Some(mut debouncer) = self.debouncer.take() else {
            return Ok(());
        };
        let result = debouncer.watcher().unwatch(self.watch_path.as_std_path());
        drop(debouncer);

        info!(path = %self.watch_path, "Change listener stopped");
        result.map_err(WatchError::from)
    }
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        // Detach before the debouncer field is dropped.
        self.sink.detach();
    }
}

/// Filters one debounced batch and raises the flag if anything was relevant.
fn handle_batch<F: FileFilter>(res: DebounceEventResult, filter: &F, sink: &Sink) {
    let events = match res {
        Ok(events) => events,
        Err(error) => {
            warn!(error = %error, "Debouncer error");
            return;
        }
    };

    let relevant = events
        .iter()
        .filter(|event| match Utf8Path::from_path(&event.path) {
            Some(path) => filter.should_process(path),
            None => {
                let error = WatchError::NonUtf8Path(event.path.clone());
                warn!(error = %error, "Skipping file event");
                false
            }
        })
        .count();

    if relevant == 0 {
        trace!(total = events.len(), "No relevant changes in batch");
        return;
    }

    if sink.deliver() {
        debug!(relevant, "Relevant changes detected");
    } else {
        trace!(relevant, "Changes arrived after listener was stopped");
    }
}
