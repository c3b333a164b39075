use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Sentinel capability that only the regionized host runtime exposes.
pub const DEFAULT_SENTINEL: &str = "threadedregions.RegionizedServer";
/// Environment variable a host can use to advertise its capabilities.
pub const DEFAULT_CAPABILITIES_ENV: &str = "TICKSHIM_HOST_CAPABILITIES";

/// Top-level config (tickshim.toml + TICKSHIM_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShimConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// How the backend mode is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendSelection {
    /// Probe the host for the regionized sentinel.
    #[default]
    Auto,
    /// Force the single-threaded tick-loop backend.
    Legacy,
    /// Force the region-threaded backend.
    Regionized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub backend: BackendSelection,
    /// Capability name whose presence means the regionized backend is active.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// Environment variable read by the env capability probe.
    #[serde(default = "default_capabilities_env")]
    pub capabilities_env: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            backend: BackendSelection::Auto,
            sentinel: default_sentinel(),
            capabilities_env: default_capabilities_env(),
        }
    }
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}
fn default_capabilities_env() -> String {
    DEFAULT_CAPABILITIES_ENV.to_string()
}

impl ShimConfig {
    /// Load config from a TOML file with TICKSHIM_* env var overrides.
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("TICKSHIM_").split("_")),
        )
    }

    pub fn from_figment(figment: Figment) -> crate::error::Result<Self> {
        figment
            .extract()
            .map_err(|e| crate::error::ShimError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.tickshim/tickshim.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_figment_yields_defaults() {
        let config = ShimConfig::from_figment(Figment::new()).unwrap();
        assert_eq!(config.scheduler.backend, BackendSelection::Auto);
        assert_eq!(config.scheduler.sentinel, DEFAULT_SENTINEL);
        assert_eq!(config.scheduler.capabilities_env, DEFAULT_CAPABILITIES_ENV);
    }

    #[test]
    fn toml_overrides_backend_and_sentinel() {
        let toml = r#"
            [scheduler]
            backend = "regionized"
            sentinel = "custom.Marker"
        "#;
        let config = ShimConfig::from_figment(Figment::new().merge(Toml::string(toml))).unwrap();
        assert_eq!(config.scheduler.backend, BackendSelection::Regionized);
        assert_eq!(config.scheduler.sentinel, "custom.Marker");
        assert_eq!(config.scheduler.capabilities_env, DEFAULT_CAPABILITIES_ENV);
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let toml = "[scheduler]\nbackend = \"threaded\"\n";
        let err = ShimConfig::from_figment(Figment::new().merge(Toml::string(toml))).unwrap_err();
        assert!(matches!(err, crate::error::ShimError::Config(_)));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = ShimConfig::load(Some("/nonexistent/tickshim.toml")).unwrap();
        assert_eq!(config.scheduler.sentinel, DEFAULT_SENTINEL);
    }
}
