//! # Tsubu - headless host for the falling-sand materials engine
//!
//! Loads layered configuration and material registries, and runs RON
//! scenarios against a [`World`](tsubu_core::World).

use std::path::Path;

use anyhow::{Context, Result};

pub mod config;
pub mod scenario;

// Re-export engine crates for convenience
pub use tsubu_core::simulation;
pub use tsubu_core::world;

use simulation::Materials;

/// Load a material registry from a RON file, or the built-in set
pub fn load_materials(path: Option<&Path>) -> Result<Materials> {
    match path {
        Some(path) => {
            let materials = Materials::from_ron_file(path)
                .with_context(|| format!("Failed to load materials: {}", path.display()))?;
            log::info!(
                "Loaded {} materials from {}",
                materials.len(),
                path.display()
            );
            Ok(materials)
        }
        None => Ok(Materials::builtin()),
    }
}

/// Common imports for internal use
pub mod prelude {
    pub use glam::IVec2;
    pub use tsubu_core::simulation::{MaterialId, Materials};
    pub use tsubu_core::{NoopStats, SimConfig, TickCounters, World};
}
