//! The per-tick trigger decision.
//!
//! Every host tick runs [`TriggerLoop::tick`], which looks at the pending
//! flag and the action's busy/lock signals and decides, without blocking,
//! whether to fire the action now, wait, or drop the pending trigger:
//!
//! ```text
//! pending? ──no──► Idle
//!    │yes
//! busy? ──yes──► Busy        (flag stays raised, retried next tick)
//!    │no
//! enabled? ──no──► Dropped   (flag cleared)
//!    │yes
//! locked? ──yes──► Deferred  (flag cleared, next change re-arms)
//!    │no
//! invoke ──► Triggered | Failed   (flag cleared)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use br_core::TriggerConfig;
use tracing::{debug, error, info, trace, warn};

use crate::action::RecompileAction;
use crate::state::TriggerState;

/// What a single tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    /// Nothing was pending.
    Idle,
    /// A trigger is pending but the action is busy; it stays pending.
    Busy,
    /// A trigger was pending while the recompiler was disabled and was dropped.
    Dropped,
    /// The action is locked (or its lock state is unknown); the trigger was dropped.
    Deferred,
    /// The action was invoked.
    Triggered,
    /// The action was invoked but reported an error.
    Failed,
}

impl TickOutcome {
    /// Returns `true` if the action was invoked this tick.
    #[inline]
    #[must_use]
    pub const fn invoked(self) -> bool {
        matches!(self, Self::Triggered | Self::Failed)
    }
}

/// A point-in-time copy of the trigger loop counters.
///
/// Counters use relaxed ordering; they are for reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerStats {
    /// Ticks that invoked the action successfully.
    pub triggered: u64,
    /// Ticks that found the action locked.
    pub deferred: u64,
    /// Ticks that dropped a trigger because the recompiler was disabled.
    pub dropped: u64,
    /// Ticks whose invocation returned an error.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    triggered: AtomicU64,
    deferred: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn bump(&self, outcome: TickOutcome) {
        let counter = match outcome {
            TickOutcome::Triggered => &self.triggered,
            TickOutcome::Deferred => &self.deferred,
            TickOutcome::Dropped => &self.dropped,
            TickOutcome::Failed => &self.failed,
            TickOutcome::Idle | TickOutcome::Busy => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TriggerStats {
        TriggerStats {
            triggered: self.triggered.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Decides, once per tick, whether to fire the recompile action.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use br_core::TriggerConfig;
/// use br_trigger::{ActionError, RecompileAction, TickOutcome, TriggerLoop, TriggerState};
///
/// struct Refresh;
///
/// impl RecompileAction for Refresh {
///     fn invoke(&self) -> Result<(), ActionError> { Ok(()) }
///     fn is_busy(&self) -> bool { false }
///     fn is_locked(&self) -> Result<bool, ActionError> { Ok(false) }
/// }
///
/// let state = Arc::new(TriggerState::new());
/// let trigger = TriggerLoop::new(Arc::clone(&state), Refresh, TriggerConfig::default());
///
/// assert_eq!(trigger.tick(), TickOutcome::Idle);
/// ```
#[derive(Debug)]
pub struct TriggerLoop<A> {
    state: Arc<TriggerState>,
    action: A,
    config: TriggerConfig,
    lock_warning_emitted: AtomicBool,
    counters: Counters,
}

impl<A: RecompileAction> TriggerLoop<A> {
    /// Creates a trigger loop over `state` driving `action`.
    pub fn new(state: Arc<TriggerState>, action: A, config: TriggerConfig) -> Self {
        Self {
            state,
            action,
            config,
            lock_warning_emitted: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Runs one tick of the decision procedure.
    ///
    /// Never blocks. Invokes the action at most once.
    pub fn tick(&self) -> TickOutcome {
        let outcome = self.decide();
        self.counters.bump(outcome);
        outcome
    }

    fn decide(&self) -> TickOutcome {
        let pending = self.state.pending();

        if !pending.is_raised() {
            return TickOutcome::Idle;
        }

        if self.action.is_busy() {
            trace!("Changes pending, action busy");
            return TickOutcome::Busy;
        }

        if !self.state.run_state().is_enabled() {
            pending.clear();
            debug!("Dropping pending trigger, recompiler is disabled");
            return TickOutcome::Dropped;
        }

        if self.config.lock_check && self.action_locked() {
            info!("changes detected but action is locked, deferring");
            pending.clear();
            return TickOutcome::Deferred;
        }

        if self.config.log_on_trigger {
            info!("changes detected, triggering refresh");
        } else {
            debug!("changes detected, triggering refresh");
        }

        // Cleared before invoking so changes landing mid-invocation re-arm it.
        pending.clear();

        match self.action.invoke() {
            Ok(()) => TickOutcome::Triggered,
            Err(error) => {
                error!(error = %error, "Refresh action failed");
                TickOutcome::Failed
            }
        }
    }

    /// Queries the lock state, failing closed when it is unavailable.
    fn action_locked(&self) -> bool {
        match self.action.is_locked() {
            Ok(locked) => locked,
            Err(error) => {
                if !self.lock_warning_emitted.swap(true, Ordering::Relaxed) {
                    warn!(
                        error = %error,
                        "Cannot determine whether the action is locked; treating it as locked"
                    );
                }
                true
            }
        }
    }

    /// Returns the shared state.
    #[must_use]
    pub fn state(&self) -> &Arc<TriggerState> {
        &self.state
    }

    /// Returns the driven action.
    #[must_use]
    pub fn action(&self) -> &A {
        &self.action
    }

    /// Returns the trigger configuration.
    #[must_use]
    pub const fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Returns a snapshot of the decision counters.
    #[must_use]
    pub fn stats(&self) -> TriggerStats {
        self.counters.snapshot()
    }
}
