//! The outbound seam: what the shim needs from a host scheduler.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tickshim_core::{EntityId, Location, PluginId};

use crate::error::HostError;

/// Task body as handed to the host. Repeating tasks call it once per period.
pub type Thunk = Box<dyn FnMut() + Send + 'static>;

/// Invoked by the host if a pinned task's target goes away before it runs.
pub type RetireFn = Box<dyn FnOnce() + Send + 'static>;

/// When a task fires, in some time unit `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing<T> {
    Now,
    Delayed(T),
    Repeating { delay: T, period: T },
}

impl<T> Timing<T> {
    pub fn map<U>(self, f: impl Fn(T) -> U) -> Timing<U> {
        match self {
            Timing::Now => Timing::Now,
            Timing::Delayed(d) => Timing::Delayed(f(d)),
            Timing::Repeating { delay, period } => Timing::Repeating {
                delay: f(delay),
                period: f(period),
            },
        }
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self, Timing::Repeating { .. })
    }
}

/// Unit the host's async pool counts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockUnit {
    Ticks,
    WallClock,
}

/// Async timing in whichever unit the active backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncTiming {
    Ticks(Timing<u64>),
    WallClock(Timing<Duration>),
}

/// A task object returned by the regionized host.
pub trait ScheduledTask: Send + Sync + fmt::Debug {
    fn cancel(&self) -> Result<(), HostError>;
    fn is_cancelled(&self) -> bool;
}

/// Backend-native cancellation token.
#[derive(Debug, Clone)]
pub enum NativeToken {
    /// Task id in the legacy host's own id space.
    TickQueue(i32),
    /// Task object owned by the regionized host.
    Scheduled(Arc<dyn ScheduledTask>),
}

impl NativeToken {
    /// The legacy host's integer task id, if this is a legacy token.
    pub fn tick_id(&self) -> Option<i32> {
        match self {
            NativeToken::TickQueue(id) => Some(*id),
            NativeToken::Scheduled(_) => None,
        }
    }

    /// The regionized host's task object, if this is a regionized token.
    pub fn scheduled_task(&self) -> Option<&Arc<dyn ScheduledTask>> {
        match self {
            NativeToken::TickQueue(_) => None,
            NativeToken::Scheduled(task) => Some(task),
        }
    }
}

/// Whose thread a caller wants to run on.
#[derive(Debug, Clone, Copy)]
pub enum Owner<'a> {
    /// The primary tick thread (legacy) or global coordination thread (regionized).
    Global,
    Region(&'a Location),
    Entity(&'a EntityId),
}

/// Native scheduler provided by the host process.
///
/// Delay and period arrive in ticks, except for async submissions on a
/// wall-clock backend. Every call returns immediately.
pub trait HostScheduler: Send + Sync {
    fn submit_global(
        &self,
        plugin: &PluginId,
        task: Thunk,
        timing: Timing<u64>,
    ) -> Result<NativeToken, HostError>;

    fn submit_region(
        &self,
        plugin: &PluginId,
        location: &Location,
        task: Thunk,
        timing: Timing<u64>,
        on_retire: Option<RetireFn>,
    ) -> Result<NativeToken, HostError>;

    fn submit_entity(
        &self,
        plugin: &PluginId,
        entity: &EntityId,
        task: Thunk,
        timing: Timing<u64>,
        on_retire: Option<RetireFn>,
    ) -> Result<NativeToken, HostError>;

    fn submit_async(
        &self,
        plugin: &PluginId,
        task: Thunk,
        timing: AsyncTiming,
    ) -> Result<NativeToken, HostError>;

    fn cancel(&self, token: &NativeToken) -> Result<(), HostError>;

    fn is_cancelled(&self, token: &NativeToken) -> Result<bool, HostError>;

    /// Whether the calling thread currently owns `owner`.
    fn owns_current_thread(&self, owner: Owner<'_>) -> bool;

    /// Whether the host is shutting down.
    fn is_stopping(&self) -> bool {
        false
    }
}
