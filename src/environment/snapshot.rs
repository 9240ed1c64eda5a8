use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use super::{RewardConfig, DEFAULT_SIZE};
use crate::error::Result;
use crate::types::State;

/// Persisted form of a grid environment.
///
/// `scenario_config` is interpreted by the scenario factory according to
/// `scenario_id`; it is kept as raw JSON so unknown scenarios can still be
/// loaded (they fall back to the basic grid).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentSnapshot {
    pub size: usize,
    pub obstacles: Vec<State>,
    pub rewards: RewardConfig,
    pub scenario_id: String,
    pub scenario_config: Value,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        EnvironmentSnapshot {
            size: DEFAULT_SIZE,
            obstacles: Vec::new(),
            rewards: RewardConfig::default(),
            scenario_id: "basic".to_string(),
            scenario_config: Value::Null,
        }
    }
}

impl EnvironmentSnapshot {
    /// Save the snapshot to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load a snapshot from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
