//! Tick-driven trigger loop and lifecycle control for bg-recompiler.
//!
//! This crate turns the pending flag armed by `br-watcher` into calls to a
//! [`RecompileAction`], at most once per host tick and never while the action
//! is busy or locked.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐  raise   ┌─────────────┐   read/clear  ┌─────────────┐
//! │  ChangeListener   │ ───────► │ PendingFlag │ ◄──────────── │ TriggerLoop │
//! │ (notify thread)   │          └─────────────┘               │  (per tick) │
//! └───────────────────┘                                        └──────┬──────┘
//!          ▲ start/stop                                  subscribe    │ invoke
//!          │                                                          ▼
//! ┌───────────────────┐        ┌───────────────┐          ┌──────────────────┐
//! │    Recompiler     │ ─────► │   HostTick    │          │ RecompileAction  │
//! │ (set_active)      │        │ (Manual/Intvl)│          │ (busy / locked)  │
//! └───────────────────┘        └───────────────┘          └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use br_core::{TriggerConfig, WatchConfig};
//! use br_trigger::{ActionError, IntervalTicker, RecompileAction, Recompiler};
//!
//! struct Rebuild;
//!
//! impl RecompileAction for Rebuild {
//!     fn invoke(&self) -> Result<(), ActionError> {
//!         println!("rebuilding");
//!         Ok(())
//!     }
//!
//!     fn is_busy(&self) -> bool {
//!         false
//!     }
//!
//!     fn is_locked(&self) -> Result<bool, ActionError> {
//!         Ok(false)
//!     }
//! }
//!
//! # async fn run() -> Result<(), br_trigger::TriggerError> {
//! let ticker = IntervalTicker::start(Duration::from_millis(250));
//! let mut recompiler = Recompiler::new(
//!     WatchConfig::new("./src"),
//!     TriggerConfig::default(),
//!     Rebuild,
//!     ticker,
//! );
//! recompiler.set_active(true).await?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod action;
pub mod error;
pub mod lifecycle;
pub mod state;
pub mod tick;
pub mod trigger;

pub use action::RecompileAction;
pub use error::{ActionError, TriggerError};
pub use lifecycle::Recompiler;
pub use state::{RunState, TriggerState};
pub use tick::{HostTick, IntervalTicker, ManualTicker, TickCallback, TickId};
pub use trigger::{TickOutcome, TriggerLoop, TriggerStats};
