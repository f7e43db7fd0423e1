//! Core configuration, settings store, and errors for the background recompiler.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Configuration structures ([`Config`], [`WatchConfig`], [`TriggerConfig`], [`TickConfig`])
//! - The boolean option store ([`ConfigStore`], [`MemoryStore`], [`JsonFileStore`])
//! - The persisted user switches ([`Settings`])
//! - [`ConfigError`] for consistent error handling

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod settings;
pub mod store;

pub use config::{Config, TickConfig, TriggerConfig, WatchConfig};
pub use error::ConfigError;
pub use settings::{Settings, keys};
pub use store::{ConfigStore, JsonFileStore, MemoryStore};
