//! User-facing switches persisted through a [`ConfigStore`].

use crate::error::ConfigError;
use crate::store::ConfigStore;

/// Store keys for [`Settings`].
pub mod keys {
    /// Whether the recompiler watches at all.
    pub const ENABLED: &str = "enabled";
    /// Whether debug-level diagnostics are shown.
    pub const DEBUG_MODE: &str = "debug_mode";
    /// Whether each trigger is logged.
    pub const LOG_ON_TRIGGER: &str = "log_on_trigger";

    /// Every key the recompiler understands.
    pub const ALL: [&str; 3] = [ENABLED, DEBUG_MODE, LOG_ON_TRIGGER];
}

/// The persisted on/off switches.
///
/// Stores written before `debug_mode` existed simply lack that key and load
/// with its default.
///
/// # Examples
///
/// ```
/// use br_core::{ConfigStore, MemoryStore, Settings};
///
/// let mut store = MemoryStore::new();
/// store.set_bool("enabled", false);
///
/// let settings = Settings::load(&store);
/// assert!(!settings.enabled);
/// assert!(settings.log_on_trigger);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Whether the recompiler is active.
    pub enabled: bool,
    /// Whether debug-level diagnostics are shown.
    pub debug_mode: bool,
    /// Whether each trigger is logged.
    pub log_on_trigger: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            debug_mode: false,
            log_on_trigger: true,
        }
    }
}

impl Settings {
    /// Reads settings from `store`, falling back to defaults per key.
    pub fn load(store: &impl ConfigStore) -> Self {
        let defaults = Self::default();
        Self {
            enabled: store.get_bool(keys::ENABLED, defaults.enabled),
            debug_mode: store.get_bool(keys::DEBUG_MODE, defaults.debug_mode),
            log_on_trigger: store.get_bool(keys::LOG_ON_TRIGGER, defaults.log_on_trigger),
        }
    }

    /// Writes every setting to `store` and flushes it.
    pub fn save(&self, store: &mut impl ConfigStore) -> Result<(), ConfigError> {
        store.set_bool(keys::ENABLED, self.enabled);
        store.set_bool(keys::DEBUG_MODE, self.debug_mode);
        store.set_bool(keys::LOG_ON_TRIGGER, self.log_on_trigger);
        store.flush()
    }

    /// Sets one switch by its store key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] for keys outside [`keys::ALL`].
    pub fn set(&mut self, key: &str, value: bool) -> Result<(), ConfigError> {
        match key {
            keys::ENABLED => self.enabled = value,
            keys::DEBUG_MODE => self.debug_mode = value,
            keys::LOG_ON_TRIGGER => self.log_on_trigger = value,
            other => return Err(ConfigError::UnknownKey(other.to_owned())),
        }
        Ok(())
    }

    /// Returns `(key, value)` pairs in [`keys::ALL`] order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, bool); 3] {
        [
            (keys::ENABLED, self.enabled),
            (keys::DEBUG_MODE, self.debug_mode),
            (keys::LOG_ON_TRIGGER, self.log_on_trigger),
        ]
    }
}
