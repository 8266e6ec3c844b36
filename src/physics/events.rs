//! Global tunables pushed into the physics world as a single message.

use std::path::Path;

use anyhow::Context;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::error::PhysicsResult;
use super::PhysicsConfig;

/// Simulation-wide tunables. Sent once at startup (or re-sent to change them).
///
/// Keys absent from a JSON document keep their default values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePhysicsDefaults {
    pub gravity: DVec2,
    pub position_correction_percentage: f64,
    pub position_correction_slop: f64,
    /// Tie-break bias for SAT axis selection and contact de-duplication.
    pub eps: f64,
    /// Parallel-segment threshold.
    pub eps_small: f64,
    pub iteration_count: u32,
}

impl UpdatePhysicsDefaults {
    /// Snapshot the tunables of an existing configuration.
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self {
            gravity: config.gravity,
            position_correction_percentage: config.position_correction_percentage,
            position_correction_slop: config.position_correction_slop,
            eps: config.eps,
            eps_small: config.eps_small,
            iteration_count: config.iteration_count,
        }
    }

    pub fn from_json(json: &str) -> PhysicsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a settings file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read physics settings from {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("invalid physics settings in {}", path.display()))
    }

    pub fn to_json(&self) -> PhysicsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for UpdatePhysicsDefaults {
    fn default() -> Self {
        Self::from_config(&PhysicsConfig::default())
    }
}
