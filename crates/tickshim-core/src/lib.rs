//! `tickshim-core`: identity types, tick arithmetic, and configuration
//! shared by the scheduling shim and its tooling.

pub mod config;
pub mod error;
pub mod types;

pub use error::{Result, ShimError};
pub use types::{ticks_to_duration, EntityId, Location, PluginId, TICK_MILLIS};
