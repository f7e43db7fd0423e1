//! Host tick: the per-iteration callback hook the trigger loop runs on.
//!
//! A [`HostTick`] invokes every subscribed callback once per iteration of
//! the host's main loop, sequentially, never overlapping itself. Two hosts
//! are provided:
//!
//! - [`ManualTicker`] - ticks only when [`ManualTicker::tick`] is called
//! - [`IntervalTicker`] - ticks on a tokio interval until stopped
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 Tick task (tokio::spawn)                  │
//! │  ┌──────────────────┐        ┌─────────────────────────┐  │
//! │  │ interval.tick()  │ ─────► │ TickRegistry::dispatch  │  │
//! │  │ (tick_ms)        │        │ (callbacks, in order)   │  │
//! │  └──────────────────┘        └─────────────────────────┘  │
//! │           ▲ cancelled()                                   │
//! └───────────│───────────────────────────────────────────────┘
//!             │
//!     CancellationToken (IntervalTicker::stop)
//! ```
//!
//! A panicking callback is caught and logged; it stays subscribed so one bad
//! tick cannot switch the feature off.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickId(u64);

/// A callback run once per host tick.
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// A host main loop that can run callbacks once per iteration.
///
/// Callbacks must not subscribe or unsubscribe from inside a tick.
pub trait HostTick: Send + Sync {
    /// Registers `callback`; it runs on every subsequent tick.
    fn subscribe(&self, callback: TickCallback) -> TickId;

    /// Removes a subscription. Returns `false` if `id` was not registered.
    ///
    /// Once this returns, the callback is not running and never runs again.
    fn unsubscribe(&self, id: TickId) -> bool;
}

impl<H: HostTick + ?Sized> HostTick for Arc<H> {
    fn subscribe(&self, callback: TickCallback) -> TickId {
        (**self).subscribe(callback)
    }

    fn unsubscribe(&self, id: TickId) -> bool {
        (**self).unsubscribe(id)
    }
}

/// Subscriptions shared by the ticker implementations.
#[derive(Default)]
struct TickRegistry {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(TickId, TickCallback)>>,
}

impl std::fmt::Debug for TickRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickRegistry")
            .field("subscribers", &self.len())
            .finish_non_exhaustive()
    }
}

impl TickRegistry {
    fn subscribe(&self, callback: TickCallback) -> TickId {
        let id = TickId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().push((id, callback));
        debug!(tick_id = id.0, "Tick callback subscribed");
        id
    }

    fn unsubscribe(&self, id: TickId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        let removed = callbacks.len() != before;
        if removed {
            debug!(tick_id = id.0, "Tick callback unsubscribed");
        }
        removed
    }

    /// Runs every callback once. Returns how many ran.
    fn dispatch(&self) -> usize {
        let mut callbacks = self.callbacks.lock();
        for (id, callback) in callbacks.iter_mut() {
            if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!(tick_id = id.0, "Tick callback panicked");
            }
        }
        callbacks.len()
    }

    fn len(&self) -> usize {
        self.callbacks.lock().len()
    }
}

/// A host that ticks only on request. Used by tests and embedders that own
/// their main loop.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use br_trigger::{HostTick, ManualTicker};
///
/// let ticker = ManualTicker::new();
/// let count = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&count);
///
/// let id = ticker.subscribe(Box::new(move || {
///     seen.fetch_add(1, Ordering::SeqCst);
/// }));
/// ticker.tick();
/// ticker.tick();
/// assert!(ticker.unsubscribe(id));
/// ticker.tick();
///
/// assert_eq!(count.load(Ordering::SeqCst), 2);
/// ```
#[derive(Debug, Default)]
pub struct ManualTicker {
    registry: TickRegistry,
}

impl ManualTicker {
    /// Creates a ticker with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one tick. Returns the number of callbacks invoked.
    pub fn tick(&self) -> usize {
        self.registry.dispatch()
    }

    /// Returns the number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }
}

impl HostTick for ManualTicker {
    fn subscribe(&self, callback: TickCallback) -> TickId {
        self.registry.subscribe(callback)
    }

    fn unsubscribe(&self, id: TickId) -> bool {
        self.registry.unsubscribe(id)
    }
}

/// A host that ticks on a fixed tokio interval.
///
/// Missed ticks are skipped rather than bursted.
#[derive(Debug)]
pub struct IntervalTicker {
    registry: Arc<TickRegistry>,
    cancellation_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    period: Duration,
}

impl IntervalTicker {
    /// Starts ticking every `period` (at least 1 ms).
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let registry = Arc::new(TickRegistry::default());
        let cancellation_token = CancellationToken::new();

        let task_registry = Arc::clone(&registry);
        let task_token = cancellation_token.clone();

        debug!(period_ms = period.as_millis(), "Starting tick loop");

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = task_token.cancelled() => {
                        debug!("Tick loop cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let ran = task_registry.dispatch();
                        trace!(callbacks = ran, "Tick");
                    }
                }
            }
        });

        Self {
            registry,
            cancellation_token,
            task: Mutex::new(Some(task)),
            period,
        }
    }

    /// Returns the tick period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Returns the number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` until the tick loop has been stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancellation_token.is_cancelled()
    }

    /// Stops ticking and waits for the tick task to finish.
    pub async fn stop(&self) {
        self.cancellation_token.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Tick task ended abnormally");
            }
        }
    }
}

impl HostTick for IntervalTicker {
    fn subscribe(&self, callback: TickCallback) -> TickId {
        self.registry.subscribe(callback)
    }

    fn unsubscribe(&self, id: TickId) -> bool {
        self.registry.unsubscribe(id)
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        // The task exits at its next select once the token is cancelled.
        self.cancellation_token.cancel();
    }
}
