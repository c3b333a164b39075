// Recording host used by the integration tests. Unless `run_inline` is set
// it never runs anything on its own; tests drive stored thunks explicitly.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use tickshim_core::{EntityId, Location, PluginId};
use tickshim_scheduler::host::{RetireFn, Thunk};
use tickshim_scheduler::{
    AsyncTiming, BackendMode, HostError, HostScheduler, NativeToken, Owner, ScheduledTask,
    TaskFacade, Timing,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Global {
        plugin: String,
        timing: Timing<u64>,
    },
    Region {
        location: Location,
        timing: Timing<u64>,
        retire: bool,
    },
    Entity {
        entity: EntityId,
        timing: Timing<u64>,
        retire: bool,
    },
    Async {
        timing: AsyncTiming,
    },
}

#[derive(Debug, Default)]
pub struct FakeTask {
    cancelled: AtomicBool,
}

impl ScheduledTask for FakeTask {
    fn cancel(&self) -> Result<(), HostError> {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return Err(HostError::AlreadyRetired);
        }
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub struct FakeHost {
    mode: BackendMode,
    calls: Mutex<Vec<Call>>,
    thunks: Mutex<Vec<Thunk>>,
    retirements: Mutex<Vec<RetireFn>>,
    next_tick_id: AtomicI32,
    cancelled_ticks: Mutex<HashSet<i32>>,
    pub cancel_attempts: AtomicI32,
    pub on_owner_thread: AtomicBool,
    pub stopping: AtomicBool,
    pub reject_submissions: AtomicBool,
    pub fail_cancellation: AtomicBool,
    pub run_inline: AtomicBool,
}

impl FakeHost {
    pub fn new(mode: BackendMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: Mutex::new(Vec::new()),
            thunks: Mutex::new(Vec::new()),
            retirements: Mutex::new(Vec::new()),
            next_tick_id: AtomicI32::new(100),
            cancelled_ticks: Mutex::new(HashSet::new()),
            cancel_attempts: AtomicI32::new(0),
            on_owner_thread: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            reject_submissions: AtomicBool::new(false),
            fail_cancellation: AtomicBool::new(false),
            run_inline: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Invoke every stored thunk once.
    pub fn run_all(&self) {
        for thunk in self.thunks.lock().unwrap().iter_mut() {
            thunk();
        }
    }

    /// Fire every stored retirement callback.
    pub fn retire_all(&self) {
        for retired in self.retirements.lock().unwrap().drain(..) {
            retired();
        }
    }

    fn record(
        &self,
        call: Call,
        mut task: Thunk,
        on_retire: Option<RetireFn>,
    ) -> Result<NativeToken, HostError> {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(HostError::Rejected("fake host refuses".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        if self.run_inline.load(Ordering::SeqCst) {
            task();
        }
        self.thunks.lock().unwrap().push(task);
        if let Some(retired) = on_retire {
            self.retirements.lock().unwrap().push(retired);
        }
        Ok(match self.mode {
            BackendMode::Legacy => {
                NativeToken::TickQueue(self.next_tick_id.fetch_add(1, Ordering::SeqCst))
            }
            BackendMode::Regionized => NativeToken::Scheduled(Arc::new(FakeTask::default())),
        })
    }
}

impl HostScheduler for FakeHost {
    fn submit_global(
        &self,
        plugin: &PluginId,
        task: Thunk,
        timing: Timing<u64>,
    ) -> Result<NativeToken, HostError> {
        let call = Call::Global {
            plugin: plugin.to_string(),
            timing,
        };
        self.record(call, task, None)
    }

    fn submit_region(
        &self,
        _plugin: &PluginId,
        location: &Location,
        task: Thunk,
        timing: Timing<u64>,
        on_retire: Option<RetireFn>,
    ) -> Result<NativeToken, HostError> {
        let call = Call::Region {
            location: location.clone(),
            timing,
            retire: on_retire.is_some(),
        };
        self.record(call, task, on_retire)
    }

    fn submit_entity(
        &self,
        _plugin: &PluginId,
        entity: &EntityId,
        task: Thunk,
        timing: Timing<u64>,
        on_retire: Option<RetireFn>,
    ) -> Result<NativeToken, HostError> {
        let call = Call::Entity {
            entity: *entity,
            timing,
            retire: on_retire.is_some(),
        };
        self.record(call, task, on_retire)
    }

    fn submit_async(
        &self,
        _plugin: &PluginId,
        task: Thunk,
        timing: AsyncTiming,
    ) -> Result<NativeToken, HostError> {
        self.record(Call::Async { timing }, task, None)
    }

    fn cancel(&self, token: &NativeToken) -> Result<(), HostError> {
        self.cancel_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancellation.load(Ordering::SeqCst) {
            return Err(HostError::Rejected("cancel refused".to_string()));
        }
        match token {
            NativeToken::TickQueue(id) => {
                self.cancelled_ticks.lock().unwrap().insert(*id);
                Ok(())
            }
            NativeToken::Scheduled(task) => task.cancel(),
        }
    }

    fn is_cancelled(&self, token: &NativeToken) -> Result<bool, HostError> {
        match token {
            NativeToken::TickQueue(id) => Ok(self.cancelled_ticks.lock().unwrap().contains(id)),
            NativeToken::Scheduled(task) => Ok(task.is_cancelled()),
        }
    }

    fn owns_current_thread(&self, _owner: Owner<'_>) -> bool {
        self.on_owner_thread.load(Ordering::SeqCst)
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

pub fn facade(mode: BackendMode) -> (Arc<FakeHost>, TaskFacade) {
    let host = FakeHost::new(mode);
    let facade = TaskFacade::new(mode, host.clone());
    (host, facade)
}

pub fn spawn_location() -> Location {
    Location::new("world", 0.0, 64.0, 0.0)
}
