//! Error types for the br-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration and
//! settings-store errors that can occur across the workspace.

use camino::Utf8PathBuf;

/// Errors that can occur while loading, validating, or persisting configuration.
///
/// # Examples
///
/// ```
/// use br_core::ConfigError;
///
/// let error = ConfigError::UnknownKey("colour".to_owned());
/// assert!(error.to_string().contains("colour"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// A settings key that the recompiler does not know.
    #[error("unknown settings key '{0}'")]
    UnknownKey(String),

    /// The settings file exists but does not hold a JSON object of booleans.
    #[error("settings file {path} is malformed: {reason}")]
    MalformedStore {
        /// Path of the settings file.
        path: Utf8PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// An I/O error occurred while reading or writing configuration.
    #[error("failed to access configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize configuration.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::InvalidOption {
            option: "tick.tick_ms".to_owned(),
            reason: "must be positive".to_owned(),
        };
        insta::assert_snapshot!(
            error.to_string(),
            @"invalid configuration option 'tick.tick_ms': must be positive"
        );
    }

    #[test]
    fn test_unknown_key_display() {
        let error = ConfigError::UnknownKey("log_compiles".to_owned());
        insta::assert_snapshot!(error.to_string(), @"unknown settings key 'log_compiles'");
    }

    #[test]
    fn test_malformed_store_display() {
        let error = ConfigError::MalformedStore {
            path: Utf8PathBuf::from("/tmp/settings.json"),
            reason: "value for 'enabled' is not a boolean".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("/tmp/settings.json"));
        assert!(msg.contains("not a boolean"));
    }
}
