//! `tickshim-scheduler`: one task API over two mutually exclusive host schedulers.
//!
//! # Overview
//!
//! The host runs either a single-threaded tick loop ([`BackendMode::Legacy`])
//! or a region-threaded loop ([`BackendMode::Regionized`]). The mode is
//! resolved once by [`detect`] and handed to a [`TaskFacade`], which routes
//! every submission to the matching [`HostScheduler`] call and keeps an
//! identifier registry so tasks can be cancelled by id on either backend.
//!
//! # Routing
//!
//! | Mode         | Global                     | Region                | Entity                       |
//! |--------------|----------------------------|-----------------------|------------------------------|
//! | `Legacy`     | single tick queue          | `UnsupportedPlacement`| `UnsupportedPlacement`       |
//! | `Regionized` | global coordination thread | thread owning region  | thread currently owning entity |
//!
//! Async submissions skip the tick queue in both modes. [`ThreadAffinity`]
//! layers run-or-defer helpers on top of the facade.

pub mod affinity;
pub mod detect;
pub mod error;
pub mod facade;
pub mod handle;
pub mod host;
pub mod registry;
pub mod types;

pub use affinity::{Dispatch, ThreadAffinity};
pub use detect::{
    is_regionized, resolve_mode, BackendMode, CapabilityProbe, DeclaredCapabilities,
    EnvCapabilities,
};
pub use error::{HostError, ProbeError, Result, SchedulerError};
pub use facade::TaskFacade;
pub use handle::TaskHandle;
pub use host::{AsyncTiming, ClockUnit, HostScheduler, NativeToken, Owner, ScheduledTask, Timing};
pub use types::{Placement, TaskId, TaskRequest, ThreadClass};
