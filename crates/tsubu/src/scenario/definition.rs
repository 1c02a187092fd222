//! Scenario definition and RON file loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tsubu_core::SimConfig;

use super::actions::ScenarioAction;
use super::verification::VerificationCondition;

/// Top-level scenario definition loaded from RON files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Scenario name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// World the scenario runs in
    #[serde(default)]
    pub world: WorldSetup,

    /// Initial setup actions (run before main scenario)
    #[serde(default)]
    pub setup: Vec<ScenarioAction>,

    /// Main scenario actions
    pub actions: Vec<ScenarioAction>,

    /// Verification checks to run after scenario
    #[serde(default)]
    pub verify: Vec<VerificationCondition>,
}

/// Grid and engine overrides for a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSetup {
    pub width: u32,
    pub height: u32,
    /// RNG seed (host default when absent)
    pub seed: Option<u64>,
    /// Start with the advanced physics extension enabled
    pub advanced_physics: bool,
}

impl Default for WorldSetup {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            seed: None,
            advanced_physics: false,
        }
    }
}

impl WorldSetup {
    /// Engine settings for this world, layered over the host's
    pub fn apply(&self, base: &SimConfig) -> SimConfig {
        let mut config = base.clone();
        config.width = self.width;
        config.height = self.height;
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.physics.enabled = self.advanced_physics || base.physics.enabled;
        config
    }
}

impl ScenarioDefinition {
    /// Load scenario from RON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

        Self::from_ron_str(&content)
            .with_context(|| format!("Failed to parse RON scenario: {}", path.display()))
    }

    pub fn from_ron_str(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    /// Save scenario to RON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let ron = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize scenario to RON")?;

        std::fs::write(path.as_ref(), ron).with_context(|| {
            format!("Failed to write scenario file: {}", path.as_ref().display())
        })?;

        Ok(())
    }
}
