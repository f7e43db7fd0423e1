//! Lifecycle control: switching the recompiler on and off.
//!
//! The [`Recompiler`] owns the change listener and the tick subscription and
//! keeps them consistent with the [`RunState`]:
//!
//! ```text
//!              set_active(true)
//!   Disabled ─────────────────────► Enabled
//!   (no listener,                   (listener running,
//!    no tick,       ◄─────────────   trigger loop subscribed)
//!    flag lowered)  set_active(false)
//! ```
//!
//! The listener is constructed on a blocking worker so that registering the
//! OS watch never stalls the caller's async context.

use std::sync::Arc;
use std::time::Instant;

use br_core::{TriggerConfig, WatchConfig};
use br_watcher::{ChangeListener, ExtensionFilter, PendingFlag};
use tracing::{debug, info, warn};

use crate::action::RecompileAction;
use crate::error::TriggerError;
use crate::state::{RunState, TriggerState};
use crate::tick::{HostTick, TickId};
use crate::trigger::TriggerLoop;

/// Owns the change listener and the trigger loop's tick subscription.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use br_core::{TriggerConfig, WatchConfig};
/// use br_trigger::{ActionError, ManualTicker, RecompileAction, Recompiler};
///
/// struct Refresh;
///
/// impl RecompileAction for Refresh {
///     fn invoke(&self) -> Result<(), ActionError> { Ok(()) }
///     fn is_busy(&self) -> bool { false }
/// }
///
/// # async fn run() -> Result<(), br_trigger::TriggerError> {
/// let ticker = Arc::new(ManualTicker::new());
/// let mut recompiler = Recompiler::new(
///     WatchConfig::new("./Assets").with_extension_filter("*.cs"),
///     TriggerConfig::default(),
///     Refresh,
///     Arc::clone(&ticker),
/// );
///
/// recompiler.set_active(true).await?;
/// ticker.tick();
/// recompiler.set_active(false).await?;
/// # Ok(())
/// # }
/// ```
pub struct Recompiler<A: RecompileAction, H: HostTick> {
    config: WatchConfig,
    state: Arc<TriggerState>,
    trigger: Arc<TriggerLoop<A>>,
    host: H,
    listener: Option<ChangeListener>,
    tick_id: Option<TickId>,
}

impl<A: RecompileAction, H: HostTick> std::fmt::Debug for Recompiler<A, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recompiler")
            .field("config", &self.config)
            .field("run_state", &self.state.run_state())
            .field("listener", &self.listener)
            .field("tick_id", &self.tick_id)
            .finish_non_exhaustive()
    }
}

impl<A: RecompileAction, H: HostTick> Recompiler<A, H> {
    /// Creates a disabled recompiler.
    pub fn new(watch: WatchConfig, trigger_config: TriggerConfig, action: A, host: H) -> Self {
        let state = Arc::new(TriggerState::new());
        let trigger = Arc::new(TriggerLoop::new(
            Arc::clone(&state),
            action,
            trigger_config,
        ));

        Self {
            config: watch,
            state,
            trigger,
            host,
            listener: None,
            tick_id: None,
        }
    }

    /// Switches the recompiler on or off.
    ///
    /// Enabling disposes any existing listener before starting a new one,
    /// so calling it while already enabled restarts the listener. Disabling
    /// never fails.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError`] if the listener cannot be constructed. The
    /// recompiler is left disabled in that case.
    pub async fn set_active(&mut self, enable: bool) -> Result<(), TriggerError> {
        if enable {
            if let Err(e) = self.enable().await {
                self.disable();
                return Err(e);
            }
        } else {
            self.disable();
        }
        Ok(())
    }

    /// Replaces the watch configuration.
    ///
    /// A running listener is restarted with the new configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError`] if the restarted listener cannot be
    /// constructed; the recompiler is then disabled.
    pub async fn reconfigure(&mut self, watch: WatchConfig) -> Result<(), TriggerError> {
        self.config = watch;
        if self.state.run_state().is_enabled() {
            info!(path = %self.config.root_path, "Restarting change listener");
            self.set_active(true).await?;
        }
        Ok(())
    }

    /// Disables the recompiler.
    pub fn shutdown(&mut self) {
        self.disable();
    }

    async fn enable(&mut self) -> Result<(), TriggerError> {
        let was_enabled = self.state.run_state().is_enabled();

        // Disabled until the new listener is published, so a caller that
        // drops this future never leaves Enabled without a listener.
        if let Some(id) = self.tick_id.take() {
            self.host.unsubscribe(id);
        }
        self.state.set_run_state(RunState::Disabled);
        self.dispose_listener();

        if !was_enabled {
            // Anything raised while disabled is stale.
            self.state.pending().clear();
        }

        self.config.validate()?;
        let filter = ExtensionFilter::from_pattern(&self.config.extension_filter)?;

        let config = self.config.clone();
        let flag = self.state.pending().clone();
        let started = Instant::now();
        let mut guard = PublishGuard::new(Arc::clone(&self.state));

        let listener =
            tokio::task::spawn_blocking(move || ChangeListener::start(&config, filter, flag))
                .await
                .map_err(|e| TriggerError::Worker(e.to_string()))??;

        guard.disarm();
        debug!(
            elapsed_ms = started.elapsed().as_millis(),
            "Change listener published"
        );
        self.listener = Some(listener);
        self.state.set_run_state(RunState::Enabled);

        let trigger = Arc::clone(&self.trigger);
        self.tick_id = Some(self.host.subscribe(Box::new(move || {
            trigger.tick();
        })));

        info!(
            path = %self.config.root_path,
            filter = %self.config.extension_filter,
            "Recompiler enabled"
        );
        Ok(())
    }

    fn disable(&mut self) {
        let was_enabled = self.state.run_state().is_enabled();

        if let Some(id) = self.tick_id.take() {
            self.host.unsubscribe(id);
        }
        self.state.set_run_state(RunState::Disabled);
        self.dispose_listener();
        self.state.pending().clear();

        if was_enabled {
            info!("Recompiler disabled");
        } else {
            debug!("Recompiler already disabled");
        }
    }

    fn dispose_listener(&mut self) {
        if let Some(listener) = self.listener.take() {
            if let Err(e) = listener.stop() {
                warn!(error = %e, "Failed to stop change listener");
            }
        }
    }

    /// Returns the current run state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.state.run_state()
    }

    /// Returns `true` while a listener is running and the trigger loop is
    /// subscribed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.run_state().is_enabled() && self.listener.is_some()
    }

    /// Returns the pending flag.
    #[must_use]
    pub fn pending(&self) -> &PendingFlag {
        self.state.pending()
    }

    /// Returns the watch configuration used by the next enable.
    #[must_use]
    pub const fn watch_config(&self) -> &WatchConfig {
        &self.config
    }

    /// Returns the trigger loop.
    #[must_use]
    pub fn trigger(&self) -> &Arc<TriggerLoop<A>> {
        &self.trigger
    }

    /// Returns the running listener, if any.
    #[must_use]
    pub fn listener(&self) -> Option<&ChangeListener> {
        self.listener.as_ref()
    }
}

/// Clears the pending flag if listener construction is abandoned before the
/// listener is published.
struct PublishGuard {
    state: Arc<TriggerState>,
    armed: bool,
}

impl PublishGuard {
    fn new(state: Arc<TriggerState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PublishGuard {
    fn drop(&mut self) {
        if self.armed {
            self.state.pending().clear();
            debug!("Change listener construction abandoned, recompiler left disabled");
        }
    }
}

impl<A: RecompileAction, H: HostTick> Drop for Recompiler<A, H> {
    fn drop(&mut self) {
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::tick::ManualTicker;
    use br_watcher::WatchError;
    use camino::Utf8PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct CountingAction {
        invocations: AtomicUsize,
    }

    impl RecompileAction for CountingAction {
        fn invoke(&self) -> Result<(), ActionError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_busy(&self) -> bool {
            false
        }

        fn is_locked(&self) -> Result<bool, ActionError> {
            Ok(false)
        }
    }

    type TestRecompiler = Recompiler<Arc<CountingAction>, Arc<ManualTicker>>;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("tempdir path is UTF-8")
    }

    fn recompiler_for(root: Utf8PathBuf) -> (TestRecompiler, Arc<ManualTicker>, Arc<CountingAction>) {
        let ticker = Arc::new(ManualTicker::new());
        let action = Arc::new(CountingAction::default());
        let recompiler = Recompiler::new(
            WatchConfig::new(root).with_debounce_ms(20),
            TriggerConfig::default(),
            Arc::clone(&action),
            Arc::clone(&ticker),
        );
        (recompiler, ticker, action)
    }

    #[tokio::test]
    async fn test_enable_subscribes_and_starts_listener() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, _) = recompiler_for(utf8_dir(&dir));

        assert_eq!(recompiler.run_state(), RunState::Disabled);
        recompiler.set_active(true).await.expect("enable");

        assert!(recompiler.is_active());
        assert_eq!(ticker.subscriber_count(), 1);
        assert!(recompiler.listener().is_some_and(ChangeListener::is_attached));
    }

    #[tokio::test]
    async fn test_enable_twice_keeps_one_subscription() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, _) = recompiler_for(utf8_dir(&dir));

        recompiler.set_active(true).await.expect("enable");
        recompiler.pending().raise();
        recompiler.set_active(true).await.expect("enable again");

        assert!(recompiler.is_active());
        assert_eq!(ticker.subscriber_count(), 1);
        // Re-enabling while enabled keeps pending work.
        assert!(recompiler.pending().is_raised());
    }

    #[tokio::test]
    async fn test_tick_drives_trigger_loop() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, action) = recompiler_for(utf8_dir(&dir));

        recompiler.set_active(true).await.expect("enable");
        recompiler.pending().raise();
        ticker.tick();
        ticker.tick();

        assert_eq!(action.invocations.load(Ordering::SeqCst), 1);
        assert!(!recompiler.pending().is_raised());
    }

    #[tokio::test]
    async fn test_disable_unsubscribes_and_clears_flag() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, action) = recompiler_for(utf8_dir(&dir));

        recompiler.set_active(true).await.expect("enable");
        recompiler.pending().raise();
        recompiler.set_active(false).await.expect("disable");

        assert_eq!(recompiler.run_state(), RunState::Disabled);
        assert!(!recompiler.is_active());
        assert!(recompiler.listener().is_none());
        assert!(!recompiler.pending().is_raised());
        assert_eq!(ticker.subscriber_count(), 0);

        ticker.tick();
        assert_eq!(action.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disable_is_idempotent() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, _) = recompiler_for(utf8_dir(&dir));

        recompiler.set_active(false).await.expect("disable");
        recompiler.set_active(false).await.expect("disable again");

        assert_eq!(recompiler.run_state(), RunState::Disabled);
        assert_eq!(ticker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_enable_clears_stale_flag() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, action) = recompiler_for(utf8_dir(&dir));

        recompiler.pending().raise();
        recompiler.set_active(true).await.expect("enable");
        assert!(!recompiler.pending().is_raised());

        ticker.tick();
        assert_eq!(action.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enable_missing_root_stays_disabled() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, _) = recompiler_for(utf8_dir(&dir).join("missing"));

        let err = recompiler.set_active(true).await.expect_err("missing root");

        assert!(matches!(err, TriggerError::Watch(WatchError::PathNotFound(_))));
        assert_eq!(recompiler.run_state(), RunState::Disabled);
        assert_eq!(ticker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_restart_disables() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = utf8_dir(&dir);
        let (mut recompiler, ticker, _) = recompiler_for(root.clone());

        recompiler.set_active(true).await.expect("enable");
        let err = recompiler
            .reconfigure(WatchConfig::new(root.join("gone")))
            .await
            .expect_err("missing root");

        assert!(matches!(err, TriggerError::Watch(_)));
        assert_eq!(recompiler.run_state(), RunState::Disabled);
        assert!(recompiler.listener().is_none());
        assert_eq!(ticker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_enable_invalid_config() {
        let (mut recompiler, _, _) = recompiler_for(Utf8PathBuf::new());
        let err = recompiler.set_active(true).await.expect_err("empty root");
        assert!(matches!(err, TriggerError::Config(_)));

        let dir = TempDir::new().expect("Failed to create temp dir");
        recompiler
            .reconfigure(WatchConfig::new(utf8_dir(&dir)).with_extension_filter("src/*.rs"))
            .await
            .expect("reconfigure while disabled only stores");
        let err = recompiler.set_active(true).await.expect_err("bad filter");
        assert!(matches!(
            err,
            TriggerError::Watch(WatchError::InvalidFilter { .. })
        ));
    }

    #[tokio::test]
    async fn test_reconfigure_restarts_listener() {
        let first = TempDir::new().expect("Failed to create temp dir");
        let second = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, _) = recompiler_for(utf8_dir(&first));

        recompiler.set_active(true).await.expect("enable");
        recompiler
            .reconfigure(WatchConfig::new(utf8_dir(&second)))
            .await
            .expect("reconfigure");

        let expected = utf8_dir(&second)
            .canonicalize_utf8()
            .expect("canonical path");
        assert_eq!(
            recompiler.listener().map(ChangeListener::watch_path),
            Some(expected.as_path())
        );
        assert_eq!(recompiler.watch_config().root_path, utf8_dir(&second));
        assert_eq!(ticker.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_restart_leaves_disabled() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, _) = recompiler_for(utf8_dir(&dir));

        recompiler.set_active(true).await.expect("enable");
        recompiler.pending().raise();

        // The listener worker cannot finish within the first poll.
        let completed = tokio::select! {
            biased;
            _ = recompiler.set_active(true) => true,
            () = std::future::ready(()) => false,
        };
        assert!(!completed, "restart should still be waiting on its worker");

        assert_eq!(recompiler.run_state(), RunState::Disabled);
        assert!(!recompiler.is_active());
        assert!(recompiler.listener().is_none());
        assert!(!recompiler.pending().is_raised());
        assert_eq!(ticker.subscriber_count(), 0);

        recompiler.set_active(true).await.expect("enable after cancel");
        assert!(recompiler.is_active());
        assert_eq!(ticker.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_disable_after_root_removed() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = utf8_dir(&dir).join("Assets");
        std::fs::create_dir(&root).expect("create root");
        let (mut recompiler, ticker, _) = recompiler_for(root.clone());

        recompiler.set_active(true).await.expect("enable");
        std::fs::remove_dir_all(&root).expect("remove root");

        recompiler.set_active(false).await.expect("disable never fails");

        assert_eq!(recompiler.run_state(), RunState::Disabled);
        assert!(recompiler.listener().is_none());
        assert_eq!(ticker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_disables() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, _) = recompiler_for(utf8_dir(&dir));

        recompiler.set_active(true).await.expect("enable");
        drop(recompiler);

        assert_eq!(ticker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (mut recompiler, ticker, _) = recompiler_for(utf8_dir(&dir));

        recompiler.set_active(true).await.expect("enable");
        recompiler.shutdown();

        assert!(!recompiler.is_active());
        assert_eq!(ticker.subscriber_count(), 0);
    }
}
