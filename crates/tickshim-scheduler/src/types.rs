use std::fmt;

use tickshim_core::{EntityId, Location, PluginId};

use crate::host::{RetireFn, Timing};

/// Facade-assigned task identifier. Starts at 1; 0 is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a synchronous task runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Legacy tick thread, or the regionized global coordination thread.
    Global,
    /// The thread owning the region that contains this location.
    Region(Location),
    /// Whichever thread owns the entity when the task fires.
    Entity(EntityId),
}

impl Placement {
    pub fn kind(&self) -> &'static str {
        match self {
            Placement::Global => "global",
            Placement::Region(_) => "region",
            Placement::Entity(_) => "entity",
        }
    }
}

/// Tick-bound or free-running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadClass {
    /// Runs on a tick thread chosen by placement.
    Sync,
    /// Runs on the host worker pool, outside the tick cadence.
    Async,
}

/// Everything a submission needs besides the task body.
///
/// Built with [`TaskRequest::sync`] or [`TaskRequest::asynchronous`] and
/// refined with the builder methods; delay and period are in ticks.
pub struct TaskRequest {
    pub plugin: PluginId,
    pub placement: Placement,
    pub thread: ThreadClass,
    pub timing: Timing<u64>,
    pub on_retire: Option<RetireFn>,
}

impl TaskRequest {
    pub fn sync(plugin: impl Into<PluginId>) -> Self {
        Self {
            plugin: plugin.into(),
            placement: Placement::Global,
            thread: ThreadClass::Sync,
            timing: Timing::Now,
            on_retire: None,
        }
    }

    pub fn asynchronous(plugin: impl Into<PluginId>) -> Self {
        Self {
            thread: ThreadClass::Async,
            ..Self::sync(plugin)
        }
    }

    pub fn at_region(mut self, location: Location) -> Self {
        self.placement = Placement::Region(location);
        self
    }

    pub fn at_entity(mut self, entity: EntityId) -> Self {
        self.placement = Placement::Entity(entity);
        self
    }

    pub fn delayed(mut self, delay_ticks: u64) -> Self {
        self.timing = Timing::Delayed(delay_ticks);
        self
    }

    pub fn repeating(mut self, delay_ticks: u64, period_ticks: u64) -> Self {
        self.timing = Timing::Repeating {
            delay: delay_ticks,
            period: period_ticks,
        };
        self
    }

    pub fn on_retire(mut self, retired: impl FnOnce() + Send + 'static) -> Self {
        self.on_retire = Some(Box::new(retired));
        self
    }
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("plugin", &self.plugin)
            .field("placement", &self.placement)
            .field("thread", &self.thread)
            .field("timing", &self.timing)
            .field("on_retire", &self.on_retire.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_global_sync_now() {
        let req = TaskRequest::sync("economy");
        assert_eq!(req.placement, Placement::Global);
        assert_eq!(req.thread, ThreadClass::Sync);
        assert_eq!(req.timing, Timing::Now);
        assert!(req.on_retire.is_none());
    }

    #[test]
    fn builder_composes() {
        let entity = EntityId::new();
        let req = TaskRequest::sync("economy")
            .at_entity(entity)
            .repeating(5, 10)
            .on_retire(|| {});
        assert_eq!(req.placement, Placement::Entity(entity));
        assert_eq!(req.timing, Timing::Repeating { delay: 5, period: 10 });
        assert!(req.on_retire.is_some());
        assert!(format!("{req:?}").contains("on_retire: true"));
    }

    #[test]
    fn asynchronous_keeps_global_placement() {
        let req = TaskRequest::asynchronous("economy").delayed(20);
        assert_eq!(req.thread, ThreadClass::Async);
        assert_eq!(req.placement.kind(), "global");
        assert_eq!(req.timing, Timing::Delayed(20));
    }
}
