//! Configuration structures for the background recompiler.
//!
//! This module provides configuration types for every component:
//!
//! - [`WatchConfig`] - Change listener settings (root, extension filter, recursion)
//! - [`TriggerConfig`] - Trigger loop settings (lock check, trigger logging)
//! - [`TickConfig`] - Host tick interval
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a partial JSON file only overrides what it names.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the change listener.
///
/// A watch session is started from one `WatchConfig` and never mutated
/// while it runs; starting a session with a different configuration
/// requires stopping the old one first.
///
/// # Examples
///
/// ```
/// use br_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.extension_filter, "*.rs");
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory whose contents are watched.
    pub root_path: Utf8PathBuf,

    /// File name pattern for relevant changes, e.g. `*.cs`.
    ///
    /// Several patterns may be separated by `,` or `;`. `*` and `*.*`
    /// accept every file.
    pub extension_filter: String,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,

    /// Debounce window in milliseconds.
    ///
    /// Bursts of changes inside this window reach the pending flag as one
    /// notification batch.
    pub debounce_ms: u64,
}

impl WatchConfig {
    /// Creates a watch configuration for `root_path` with default settings.
    #[must_use]
    pub fn new(root_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Replaces the extension filter pattern.
    #[must_use]
    pub fn with_extension_filter(mut self, pattern: impl Into<String>) -> Self {
        self.extension_filter = pattern.into();
        self
    }

    /// Sets recursive mode.
    #[must_use]
    pub const fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Sets the debounce window.
    #[must_use]
    pub const fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Checks the values that can be validated without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for an empty root path or an
    /// empty extension filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_path.as_str().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "watch.root_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.extension_filter.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "watch.extension_filter".to_owned(),
                reason: "must not be empty (use \"*\" to watch every file)".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root_path: Utf8PathBuf::new(),
            extension_filter: "*.rs".to_owned(),
            recursive: true,
            debounce_ms: 100,
        }
    }
}

/// Configuration for the trigger loop.
///
/// # Examples
///
/// ```
/// use br_core::TriggerConfig;
///
/// let config = TriggerConfig::default();
/// assert!(config.lock_check);
/// assert!(config.log_on_trigger);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Query the action's lock state before triggering.
    ///
    /// When disabled, the lock state is never consulted and only the busy
    /// signal gates a trigger.
    pub lock_check: bool,

    /// Emit an informational log line for every trigger.
    pub log_on_trigger: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            lock_check: true,
            log_on_trigger: true,
        }
    }
}

/// Configuration for the host tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Interval between ticks in milliseconds.
    pub tick_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { tick_ms: 250 }
    }
}

/// Root configuration for the background recompiler.
///
/// # Examples
///
/// ```
/// use br_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"tick": {"tick_ms": 50}}"#).unwrap();
/// assert_eq!(config.tick.tick_ms, 50);
/// assert_eq!(config.watch.debounce_ms, 100);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Change listener configuration.
    pub watch: WatchConfig,

    /// Trigger loop configuration.
    pub trigger: TriggerConfig,

    /// Host tick configuration.
    pub tick: TickConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing sections and fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON for this structure.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        tracing::debug!(path = %path, "Loaded configuration file");
        Ok(config)
    }
}
