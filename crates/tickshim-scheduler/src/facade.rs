use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tickshim_core::{config::SchedulerConfig, ticks_to_duration, EntityId, Location, PluginId};
use tracing::{debug, trace, warn};

use crate::{
    detect::{resolve_mode, BackendMode, CapabilityProbe},
    error::{HostError, Result, SchedulerError},
    handle::{HandleInner, Submission, TaskHandle},
    host::{AsyncTiming, ClockUnit, HostScheduler, NativeToken, RetireFn, Thunk, Timing},
    registry::{Entry, Registry},
    types::{Placement, TaskId, TaskRequest, ThreadClass},
};

/// Validated destination of one submission.
enum Route {
    Global,
    Region(Location),
    Entity(EntityId),
    Async,
}

/// End-of-life hook for one submission: drops its registry entry and clears
/// the handle once the host has run it, or retired it.
#[derive(Clone)]
struct Completion {
    id: TaskId,
    registry: Weak<Registry>,
    handle: Weak<HandleInner>,
    done: Arc<AtomicBool>,
}

impl Completion {
    fn new(id: TaskId, registry: &Arc<Registry>, handle: &TaskHandle) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
            handle: handle.downgrade(),
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    fn finish(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        if let Some(inner) = self.handle.upgrade() {
            inner.clear_if(self.id);
        }
        trace!(task_id = %self.id, "task finished");
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn wrap_task(&self, mut body: Thunk) -> Thunk {
        let completion = self.clone();
        Box::new(move || {
            body();
            completion.finish();
        })
    }

    fn wrap_retire(&self, retired: RetireFn) -> RetireFn {
        let completion = self.clone();
        Box::new(move || {
            retired();
            completion.finish();
        })
    }
}

/// Uniform submission API over whichever host backend is active.
///
/// Owns its own [`Registry`]; two facades never share identifiers.
pub struct TaskFacade {
    mode: BackendMode,
    host: Arc<dyn HostScheduler>,
    registry: Arc<Registry>,
}

impl TaskFacade {
    pub fn new(mode: BackendMode, host: Arc<dyn HostScheduler>) -> Self {
        Self {
            mode,
            host,
            registry: Arc::new(Registry::new()),
        }
    }

    /// Resolve the mode from config (forced or probed) and build a facade.
    pub fn from_config(
        config: &SchedulerConfig,
        probe: &dyn CapabilityProbe,
        host: Arc<dyn HostScheduler>,
    ) -> Self {
        Self::new(resolve_mode(config, probe), host)
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub(crate) fn host(&self) -> &dyn HostScheduler {
        self.host.as_ref()
    }

    /// Create a handle for `body` and submit it.
    pub fn spawn(
        &self,
        request: TaskRequest,
        body: impl Fn() + Send + Sync + 'static,
    ) -> Result<TaskHandle> {
        let handle = TaskHandle::new(body);
        self.submit(&handle, request)?;
        Ok(handle)
    }

    /// Submit `handle` to the active backend.
    ///
    /// Fails with `AlreadyRunning` if the handle has a live submission, and
    /// with `InvalidArgument` / `UnsupportedPlacement` before touching the
    /// host. On success the id is registered before this returns. A
    /// one-shot task removes its own entry once it has run.
    ///
    /// The host is called without the handle lock held, so it may run the
    /// task inline.
    pub fn submit(&self, handle: &TaskHandle, request: TaskRequest) -> Result<TaskId> {
        if let Some(live) = handle.task_id() {
            return Err(SchedulerError::AlreadyRunning { id: live });
        }

        let route = self.route(&request)?;
        let TaskRequest {
            plugin,
            timing,
            on_retire,
            ..
        } = request;
        let placement = route.kind();
        let periodic = timing.is_periodic();

        let id = self.registry.allocate();
        let completion = Completion::new(id, &self.registry, handle);
        let task = if periodic {
            handle.thunk()
        } else {
            completion.wrap_task(handle.thunk())
        };
        let on_retire = on_retire.map(|retired| completion.wrap_retire(retired));

        let token = match self.dispatch(&plugin, route, task, timing, on_retire) {
            Ok(token) => token,
            Err(e) => {
                warn!(%plugin, placement, mode = %self.mode, error = %e, "host rejected task");
                return Err(e.into());
            }
        };

        let mut current = handle.inner().lock();
        if let Some(live) = current.as_ref() {
            let live = live.id;
            drop(current);
            debug!(task_id = %id, live = %live, "concurrent submission of the same handle");
            self.cancel_native(id, &token);
            return Err(SchedulerError::AlreadyRunning { id: live });
        }

        self.registry.insert(
            id,
            Entry {
                token: token.clone(),
                handle: handle.downgrade(),
            },
        );
        handle.inner().set_periodic(periodic);
        if completion.is_done() {
            self.registry.remove(id);
            debug!(task_id = %id, %plugin, placement, "task finished before submit returned");
            return Ok(id);
        }
        *current = Some(Submission {
            id,
            token,
            registry: Arc::clone(&self.registry),
        });
        handle.inner().set_running(true);
        drop(current);

        debug!(
            task_id = %id,
            %plugin,
            placement,
            mode = %self.mode,
            periodic,
            "task submitted"
        );
        Ok(id)
    }

    /// Cancel the handle's live submission. No-op if there is none, or if
    /// the submission was made through another facade.
    pub fn cancel(&self, handle: &TaskHandle) {
        let taken = {
            let mut current = handle.inner().lock();
            if let Some(sub) = current.as_ref() {
                if !sub.belongs_to(&self.registry) {
                    debug!(task_id = %sub.id, "cancel of a task owned by another facade ignored");
                    return;
                }
            }
            handle.inner().set_running(false);
            current.take()
        };
        if let Some(sub) = taken {
            self.registry.remove(sub.id);
            self.cancel_native(sub.id, &sub.token);
        }
    }

    /// Cancel by identifier. Unknown, cancelled and finished ids are no-ops.
    pub fn cancel_id(&self, id: TaskId) {
        let Some(entry) = self.registry.remove(id) else {
            debug!(task_id = %id, "cancel of unregistered id ignored");
            return;
        };
        self.cancel_native(id, &entry.token);
        if let Some(inner) = entry.handle.upgrade() {
            inner.clear_if(id);
        }
    }

    /// The handle's running flag. A repeating task stays running until cancelled.
    pub fn is_running(&self, handle: &TaskHandle) -> bool {
        handle.is_running()
    }

    /// Ask the host whether the handle's current task is cancelled.
    ///
    /// A handle without a live submission reports `true`; a failed host
    /// query reports `false`, as does a task owned by another facade.
    pub fn is_cancelled(&self, handle: &TaskHandle) -> bool {
        let (id, token) = {
            let current = handle.inner().lock();
            match current.as_ref() {
                None => return true,
                Some(sub) if !sub.belongs_to(&self.registry) => {
                    debug!(task_id = %sub.id, "task owned by another facade");
                    return false;
                }
                Some(sub) => (sub.id, sub.token.clone()),
            }
        };
        match self.host.is_cancelled(&token) {
            Ok(cancelled) => cancelled,
            Err(e) => {
                debug!(task_id = %id, error = %e, "host cancellation query failed");
                false
            }
        }
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.registry.contains(id)
    }

    /// Number of registered (submitted, not cancelled, not finished) tasks.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // --- private helpers ---------------------------------------------------

    fn route(&self, request: &TaskRequest) -> Result<Route> {
        request.plugin.validate()?;

        if let Timing::Repeating { period: 0, .. } = request.timing {
            return Err(SchedulerError::InvalidArgument(
                "repeating task needs a period of at least one tick".to_string(),
            ));
        }

        let route = match (request.thread, &request.placement) {
            (ThreadClass::Async, Placement::Global) => Route::Async,
            (ThreadClass::Async, pinned) => {
                return Err(SchedulerError::InvalidArgument(format!(
                    "async tasks cannot be pinned to a {}",
                    pinned.kind()
                )));
            }
            (ThreadClass::Sync, Placement::Global) => Route::Global,
            (ThreadClass::Sync, Placement::Region(location)) => {
                location.validate()?;
                Route::Region(location.clone())
            }
            (ThreadClass::Sync, Placement::Entity(entity)) => {
                entity.validate()?;
                Route::Entity(*entity)
            }
        };

        if request.on_retire.is_some() && matches!(route, Route::Global | Route::Async) {
            return Err(SchedulerError::InvalidArgument(
                "retirement callback needs a region or entity placement".to_string(),
            ));
        }

        if self.mode == BackendMode::Legacy && matches!(route, Route::Region(_) | Route::Entity(_)) {
            return Err(SchedulerError::UnsupportedPlacement {
                placement: route.kind(),
                mode: self.mode,
            });
        }

        Ok(route)
    }

    fn dispatch(
        &self,
        plugin: &PluginId,
        route: Route,
        task: Thunk,
        timing: Timing<u64>,
        on_retire: Option<RetireFn>,
    ) -> std::result::Result<NativeToken, HostError> {
        match route {
            Route::Global => self.host.submit_global(plugin, task, timing),
            Route::Region(location) => {
                self.host
                    .submit_region(plugin, &location, task, timing, on_retire)
            }
            Route::Entity(entity) => {
                self.host
                    .submit_entity(plugin, &entity, task, timing, on_retire)
            }
            Route::Async => {
                let timing = match self.mode.async_clock() {
                    ClockUnit::Ticks => AsyncTiming::Ticks(timing),
                    ClockUnit::WallClock => AsyncTiming::WallClock(timing.map(ticks_to_duration)),
                };
                self.host.submit_async(plugin, task, timing)
            }
        }
    }

    /// Best-effort host cancellation.
    ///
    /// Host errors are discarded; the host may refuse a redundant cancel.
    fn cancel_native(&self, id: TaskId, token: &NativeToken) {
        if let Err(e) = self.host.cancel(token) {
            debug!(task_id = %id, error = %e, "host cancellation error discarded");
        } else {
            debug!(task_id = %id, "task cancelled");
        }
    }
}

impl Route {
    fn kind(&self) -> &'static str {
        match self {
            Route::Global => "global",
            Route::Region(_) => "region",
            Route::Entity(_) => "entity",
            Route::Async => "async",
        }
    }
}
