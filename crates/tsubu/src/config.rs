//! Host configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `tsubu.ron` file (if exists)
//! 3. Environment variables prefixed with `TSUBU_`
//!
//! Example environment variable: `TSUBU_SIMULATION__THERMAL__RATE=0.3`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tsubu_core::SimConfig;

/// Main host configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    /// Engine settings used as the base for every scenario world
    #[serde(default)]
    pub simulation: SimConfig,

    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Scenario runner settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunnerConfig {
    /// Material registry file; the built-in set is used when absent
    pub materials: Option<PathBuf>,
    /// Directory for JSON execution reports (none written when absent)
    pub report_dir: Option<PathBuf>,
    /// Log every action as it runs
    pub verbose: bool,
}

impl HostConfig {
    /// Load configuration from `tsubu.ron` in the working directory and the
    /// environment
    pub fn load() -> Result<Self> {
        Self::load_from("tsubu")
    }

    /// Load configuration with layered priority, reading the file layer from
    /// `path` (extension optional)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("runner.verbose", false)?
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name(&path)
                    .format(config::FileFormat::Ron)
                    .required(false),
            )
            // Layer 3: Environment variables (TSUBU_SIMULATION__WIDTH, etc.)
            .add_source(
                Environment::with_prefix("TSUBU")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build configuration")?;

        let host: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        host.simulation
            .validate()
            .context("Invalid simulation settings")?;
        Ok(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.simulation.ambient_temperature, 20.0);
        assert!(!config.simulation.physics.enabled);
        assert!(config.runner.materials.is_none());
        assert!(!config.runner.verbose);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostConfig::load_from(dir.path().join("absent")).unwrap();
        assert_eq!(config.simulation.seed, SimConfig::default().seed);
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.ron");
        std::fs::write(
            &path,
            r#"(
                simulation: (width: 64, height: 48, thermal: (rate: 0.3)),
                runner: (verbose: true),
            )"#,
        )
        .unwrap();

        let config = HostConfig::load_from(&path).unwrap();
        assert_eq!(config.simulation.width, 64);
        assert_eq!(config.simulation.height, 48);
        assert_eq!(config.simulation.thermal.rate, 0.3);
        // Untouched fields keep their defaults
        assert_eq!(config.simulation.ambient_temperature, 20.0);
        assert!(config.runner.verbose);
    }

    #[test]
    fn test_invalid_simulation_settings_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(simulation: (width: 0))").unwrap();

        assert!(HostConfig::load_from(&path).is_err());
    }
}
