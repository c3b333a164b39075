//! Run-or-defer helpers: execute on the owning thread, now if possible.
//!
//! Under the regionized backend an entity or location is owned by a region
//! thread; under the legacy backend everything is owned by the primary tick
//! thread, so entity and location helpers fall back to global sync tasks.
//!
//! Deferred regionized entity tasks land on the *next* tick of the owning
//! region at the earliest, since the host has to find the entity's region
//! first.

use std::sync::Arc;

use tickshim_core::{EntityId, Location, PluginId};
use tracing::trace;

use crate::{
    detect::BackendMode,
    error::Result,
    facade::TaskFacade,
    handle::TaskHandle,
    host::Owner,
    types::TaskRequest,
};

/// What an `ensure_*` / `run_*` call did with the body.
#[derive(Debug)]
pub enum Dispatch {
    /// Ran synchronously on the calling thread; nothing was registered.
    Inline,
    /// Submitted as a one-shot task to the owner.
    Deferred(TaskHandle),
}

impl Dispatch {
    pub fn is_inline(&self) -> bool {
        matches!(self, Dispatch::Inline)
    }

    pub fn into_handle(self) -> Option<TaskHandle> {
        match self {
            Dispatch::Inline => None,
            Dispatch::Deferred(handle) => Some(handle),
        }
    }
}

/// Delayed helpers never fire on the submitting tick.
fn at_least_one_tick(delay: u64) -> u64 {
    delay.max(1)
}

/// Thread-affinity helpers bound to one plugin.
pub struct ThreadAffinity {
    facade: Arc<TaskFacade>,
    plugin: PluginId,
}

impl ThreadAffinity {
    pub fn new(facade: Arc<TaskFacade>, plugin: impl Into<PluginId>) -> Self {
        Self {
            facade,
            plugin: plugin.into(),
        }
    }

    pub fn facade(&self) -> &TaskFacade {
        &self.facade
    }

    fn regionized(&self) -> bool {
        self.facade.mode() == BackendMode::Regionized
    }

    fn sync(&self) -> TaskRequest {
        TaskRequest::sync(self.plugin.clone())
    }

    fn run_inline(&self, owner: &'static str, body: impl FnOnce()) -> Result<Dispatch> {
        trace!(plugin = %self.plugin, owner, "running inline on owning thread");
        body();
        Ok(Dispatch::Inline)
    }

    /// Run on the thread owning `entity`.
    pub fn ensure_entity(
        &self,
        entity: &EntityId,
        body: impl Fn() + Send + Sync + 'static,
    ) -> Result<Dispatch> {
        entity.validate()?;
        let host = self.facade.host();
        if self.regionized() {
            if host.owns_current_thread(Owner::Entity(entity)) || host.is_stopping() {
                return self.run_inline("entity", body);
            }
            let request = self.sync().at_entity(*entity).delayed(1);
            return Ok(Dispatch::Deferred(self.facade.spawn(request, body)?));
        }
        if host.owns_current_thread(Owner::Global) {
            return self.run_inline("primary", body);
        }
        Ok(Dispatch::Deferred(self.facade.spawn(self.sync(), body)?))
    }

    /// Run on the thread owning `entity` after `delay` ticks (at least one).
    pub fn ensure_entity_later(
        &self,
        entity: &EntityId,
        body: impl Fn() + Send + Sync + 'static,
        delay: u64,
    ) -> Result<TaskHandle> {
        entity.validate()?;
        let delay = at_least_one_tick(delay);
        let request = if self.regionized() {
            self.sync().at_entity(*entity).delayed(delay)
        } else {
            self.sync().delayed(delay)
        };
        self.facade.spawn(request, body)
    }

    /// Repeat on the thread owning `entity` until cancelled.
    pub fn ensure_entity_timer(
        &self,
        entity: &EntityId,
        body: impl Fn() + Send + Sync + 'static,
        delay: u64,
        period: u64,
    ) -> Result<TaskHandle> {
        entity.validate()?;
        let delay = at_least_one_tick(delay);
        let request = if self.regionized() {
            self.sync().at_entity(*entity).repeating(delay, period)
        } else {
            self.sync().repeating(delay, period)
        };
        self.facade.spawn(request, body)
    }

    /// Run on the thread owning `location`.
    pub fn ensure_location(
        &self,
        location: &Location,
        body: impl Fn() + Send + Sync + 'static,
    ) -> Result<Dispatch> {
        location.validate()?;
        let host = self.facade.host();
        if self.regionized() {
            if host.owns_current_thread(Owner::Region(location)) || host.is_stopping() {
                return self.run_inline("region", body);
            }
            let request = self.sync().at_region(location.clone());
            return Ok(Dispatch::Deferred(self.facade.spawn(request, body)?));
        }
        if host.owns_current_thread(Owner::Global) {
            return self.run_inline("primary", body);
        }
        Ok(Dispatch::Deferred(self.facade.spawn(self.sync(), body)?))
    }

    /// Run on the thread owning `location` after `delay` ticks (at least one).
    pub fn ensure_location_later(
        &self,
        location: &Location,
        body: impl Fn() + Send + Sync + 'static,
        delay: u64,
    ) -> Result<TaskHandle> {
        location.validate()?;
        let delay = at_least_one_tick(delay);
        let request = if self.regionized() {
            self.sync().at_region(location.clone()).delayed(delay)
        } else {
            self.sync().delayed(delay)
        };
        self.facade.spawn(request, body)
    }

    /// Repeat on the thread owning `location` until cancelled.
    pub fn ensure_location_timer(
        &self,
        location: &Location,
        body: impl Fn() + Send + Sync + 'static,
        delay: u64,
        period: u64,
    ) -> Result<TaskHandle> {
        location.validate()?;
        let delay = at_least_one_tick(delay);
        let request = if self.regionized() {
            self.sync().at_region(location.clone()).repeating(delay, period)
        } else {
            self.sync().repeating(delay, period)
        };
        self.facade.spawn(request, body)
    }

    /// Run on the primary / global thread.
    pub fn run_sync(&self, body: impl Fn() + Send + Sync + 'static) -> Result<Dispatch> {
        if self.regionized() && self.facade.host().is_stopping() {
            return self.run_inline("global", body);
        }
        Ok(Dispatch::Deferred(self.facade.spawn(self.sync(), body)?))
    }

    pub fn run_sync_later(
        &self,
        body: impl Fn() + Send + Sync + 'static,
        delay: u64,
    ) -> Result<TaskHandle> {
        let request = self.sync().delayed(at_least_one_tick(delay));
        self.facade.spawn(request, body)
    }

    pub fn run_sync_timer(
        &self,
        body: impl Fn() + Send + Sync + 'static,
        delay: u64,
        period: u64,
    ) -> Result<TaskHandle> {
        let request = self.sync().repeating(at_least_one_tick(delay), period);
        self.facade.spawn(request, body)
    }

    /// Run on the host worker pool.
    pub fn run_async(&self, body: impl Fn() + Send + Sync + 'static) -> Result<Dispatch> {
        if self.regionized() && self.facade.host().is_stopping() {
            return self.run_inline("async", body);
        }
        let request = TaskRequest::asynchronous(self.plugin.clone());
        Ok(Dispatch::Deferred(self.facade.spawn(request, body)?))
    }

    pub fn run_async_later(
        &self,
        body: impl Fn() + Send + Sync + 'static,
        delay: u64,
    ) -> Result<TaskHandle> {
        let request =
            TaskRequest::asynchronous(self.plugin.clone()).delayed(at_least_one_tick(delay));
        self.facade.spawn(request, body)
    }

    pub fn run_async_timer(
        &self,
        body: impl Fn() + Send + Sync + 'static,
        delay: u64,
        period: u64,
    ) -> Result<TaskHandle> {
        let request = TaskRequest::asynchronous(self.plugin.clone())
            .repeating(at_least_one_tick(delay), period);
        self.facade.spawn(request, body)
    }

    /// Cancel a task returned by one of the helpers. Returns whether it was running.
    pub fn cancel_timer(&self, handle: &TaskHandle) -> bool {
        let was_running = handle.is_running();
        self.facade.cancel(handle);
        was_running
    }

    pub fn is_task_cancelled(&self, handle: &TaskHandle) -> bool {
        self.facade.is_cancelled(handle)
    }
}
