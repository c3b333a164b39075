use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Result, ShimError};

/// Length of one host tick. Delays and periods are expressed in ticks.
pub const TICK_MILLIS: u64 = 50;

const TICKS_PER_SECOND: u64 = 1000 / TICK_MILLIS;

/// Convert a tick count to wall-clock time at exactly [`TICK_MILLIS`] per tick.
///
/// Exact over the whole `u64` range. Server-side tick-rate drift is not
/// compensated.
pub fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_secs(ticks / TICKS_PER_SECOND)
        + Duration::from_millis((ticks % TICKS_PER_SECOND) * TICK_MILLIS)
}

/// Identity of the plugin that owns a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginId(pub String);

impl PluginId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty name stands for an absent plugin context.
    pub fn validate(&self) -> Result<()> {
        if self.0.trim().is_empty() {
            return Err(ShimError::InvalidArgument("plugin context is absent".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PluginId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PluginId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A point in a host world. The host maps it to the region that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.world.trim().is_empty() {
            return Err(ShimError::InvalidArgument("location has no world".to_string()));
        }
        if ![self.x, self.y, self.z].iter().all(|c| c.is_finite()) {
            return Err(ShimError::InvalidArgument(format!(
                "location coordinates must be finite: {self}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({}, {}, {})", self.world, self.x, self.y, self.z)
    }
}

/// Host entity reference. The nil UUID stands for an absent entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.0.is_nil() {
            return Err(ShimError::InvalidArgument("entity is absent".to_string()));
        }
        Ok(())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
