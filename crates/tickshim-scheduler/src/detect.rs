//! Capability detection: which host scheduler is active in this process.

use std::collections::HashSet;
use std::env::{self, VarError};
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tickshim_core::config::{BackendSelection, SchedulerConfig};
use tracing::{debug, info};

use crate::{error::ProbeError, host::ClockUnit};

/// The two mutually exclusive host scheduler implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// Single tick thread plus a worker pool for async work.
    Legacy,
    /// Global thread, one thread per region, entity-following schedulers.
    Regionized,
}

impl BackendMode {
    /// Probe for `sentinel`. Absence or any probe failure means `Legacy`.
    pub fn detect(probe: &dyn CapabilityProbe, sentinel: &str) -> Self {
        match probe.resolve(sentinel) {
            Ok(()) => BackendMode::Regionized,
            Err(e) => {
                debug!(sentinel, reason = %e, "regionized sentinel absent");
                BackendMode::Legacy
            }
        }
    }

    /// Like [`detect`](Self::detect), but memoised for the process lifetime.
    ///
    /// Only the first call probes; later calls return the cached answer
    /// regardless of the probe they pass.
    pub fn cached(probe: &dyn CapabilityProbe, sentinel: &str) -> Self {
        static MODE: OnceLock<BackendMode> = OnceLock::new();
        *MODE.get_or_init(|| Self::detect(probe, sentinel))
    }

    pub fn is_regionized(self) -> bool {
        matches!(self, BackendMode::Regionized)
    }

    /// Time unit the host's async pool expects for delay and period.
    pub fn async_clock(self) -> ClockUnit {
        match self {
            BackendMode::Legacy => ClockUnit::Ticks,
            BackendMode::Regionized => ClockUnit::WallClock,
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Regionized => write!(f, "regionized"),
        }
    }
}

/// True when the regionized backend's sentinel resolves.
pub fn is_regionized(probe: &dyn CapabilityProbe, sentinel: &str) -> bool {
    BackendMode::detect(probe, sentinel).is_regionized()
}

/// Honour a forced backend from config, otherwise probe.
pub fn resolve_mode(config: &SchedulerConfig, probe: &dyn CapabilityProbe) -> BackendMode {
    let mode = match config.backend {
        BackendSelection::Legacy => BackendMode::Legacy,
        BackendSelection::Regionized => BackendMode::Regionized,
        BackendSelection::Auto => BackendMode::detect(probe, &config.sentinel),
    };
    info!(%mode, selection = ?config.backend, "backend mode resolved");
    mode
}

/// Resolves a named capability in the host environment.
pub trait CapabilityProbe: Send + Sync {
    fn resolve(&self, name: &str) -> Result<(), ProbeError>;
}

/// Capabilities the embedding host declares in-process.
#[derive(Debug, Clone, Default)]
pub struct DeclaredCapabilities {
    names: HashSet<String>,
}

impl DeclaredCapabilities {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn declare(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }
}

impl CapabilityProbe for DeclaredCapabilities {
    fn resolve(&self, name: &str) -> Result<(), ProbeError> {
        if self.names.contains(name) {
            Ok(())
        } else {
            Err(ProbeError::NotFound(name.to_string()))
        }
    }
}

/// Reads a comma-separated capability list from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCapabilities {
    var: String,
}

impl EnvCapabilities {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.capabilities_env.clone())
    }
}

impl CapabilityProbe for EnvCapabilities {
    fn resolve(&self, name: &str) -> Result<(), ProbeError> {
        match env::var(&self.var) {
            Ok(list) if list.split(',').map(str::trim).any(|c| c == name) => Ok(()),
            Ok(_) | Err(VarError::NotPresent) => Err(ProbeError::NotFound(name.to_string())),
            Err(VarError::NotUnicode(_)) => Err(ProbeError::Failed(format!(
                "{} is not valid unicode",
                self.var
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTINEL: &str = "threadedregions.RegionizedServer";

    struct BrokenProbe;

    impl CapabilityProbe for BrokenProbe {
        fn resolve(&self, _name: &str) -> Result<(), ProbeError> {
            Err(ProbeError::Failed("loader exploded".to_string()))
        }
    }

    #[test]
    fn sentinel_present_means_regionized() {
        let probe = DeclaredCapabilities::new([SENTINEL]);
        assert_eq!(BackendMode::detect(&probe, SENTINEL), BackendMode::Regionized);
        assert!(is_regionized(&probe, SENTINEL));
    }

    #[test]
    fn sentinel_absent_means_legacy() {
        let probe = DeclaredCapabilities::new(["something.Else"]);
        assert_eq!(BackendMode::detect(&probe, SENTINEL), BackendMode::Legacy);
    }

    #[test]
    fn probe_failure_means_legacy() {
        assert_eq!(BackendMode::detect(&BrokenProbe, SENTINEL), BackendMode::Legacy);
        assert!(!is_regionized(&BrokenProbe, SENTINEL));
    }

    #[test]
    fn detection_is_stable_across_calls() {
        let probe = DeclaredCapabilities::new([SENTINEL]);
        let first = BackendMode::detect(&probe, SENTINEL);
        for _ in 0..10 {
            assert_eq!(BackendMode::detect(&probe, SENTINEL), first);
        }
    }

    #[test]
    fn cached_mode_ignores_later_probes() {
        let first = BackendMode::cached(&DeclaredCapabilities::new([SENTINEL]), SENTINEL);
        let second = BackendMode::cached(&BrokenProbe, SENTINEL);
        assert_eq!(first, second);
    }

    #[test]
    fn declared_capabilities_can_grow() {
        let mut probe = DeclaredCapabilities::default();
        assert!(probe.resolve(SENTINEL).is_err());
        probe.declare(SENTINEL);
        assert!(probe.resolve(SENTINEL).is_ok());
    }

    #[test]
    fn env_probe_reads_comma_list() {
        let var = "TICKSHIM_TEST_CAPS_PRESENT";
        env::set_var(var, "foo, threadedregions.RegionizedServer ,bar");
        let probe = EnvCapabilities::new(var);
        assert_eq!(BackendMode::detect(&probe, SENTINEL), BackendMode::Regionized);
        assert!(probe.resolve("baz").is_err());
        env::remove_var(var);
    }

    #[test]
    fn env_probe_unset_is_not_found() {
        let probe = EnvCapabilities::new("TICKSHIM_TEST_CAPS_UNSET");
        assert!(matches!(probe.resolve(SENTINEL), Err(ProbeError::NotFound(_))));
    }

    #[test]
    fn forced_selection_skips_probe() {
        let config = SchedulerConfig {
            backend: BackendSelection::Regionized,
            ..SchedulerConfig::default()
        };
        assert_eq!(resolve_mode(&config, &BrokenProbe), BackendMode::Regionized);

        let config = SchedulerConfig {
            backend: BackendSelection::Legacy,
            ..SchedulerConfig::default()
        };
        let probe = DeclaredCapabilities::new([SENTINEL]);
        assert_eq!(resolve_mode(&config, &probe), BackendMode::Legacy);
    }

    #[test]
    fn auto_selection_probes_configured_sentinel() {
        let config = SchedulerConfig {
            sentinel: "custom.Marker".to_string(),
            ..SchedulerConfig::default()
        };
        let probe = DeclaredCapabilities::new(["custom.Marker"]);
        assert_eq!(resolve_mode(&config, &probe), BackendMode::Regionized);
    }

    #[test]
    fn async_clock_follows_mode() {
        assert_eq!(BackendMode::Legacy.async_clock(), ClockUnit::Ticks);
        assert_eq!(BackendMode::Regionized.async_clock(), ClockUnit::WallClock);
    }
}
