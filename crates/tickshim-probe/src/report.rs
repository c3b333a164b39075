use serde::Serialize;
use tickshim_core::{
    config::{BackendSelection, SchedulerConfig},
    TICK_MILLIS,
};
use tickshim_scheduler::BackendMode;

/// What `--json` prints.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub mode: BackendMode,
    pub selection: BackendSelection,
    pub sentinel: String,
    pub capabilities_env: String,
    pub tick_millis: u64,
}

impl ProbeReport {
    pub fn new(mode: BackendMode, config: &SchedulerConfig) -> Self {
        Self {
            mode,
            selection: config.backend,
            sentinel: config.sentinel.clone(),
            capabilities_env: config.capabilities_env.clone(),
            tick_millis: TICK_MILLIS,
        }
    }
}
