//! Advanced physics extension: air field, particle velocities, collisions
//! and mass attraction

mod attraction;
mod field_grid;
mod kinetics;

pub use attraction::AttractionField;
pub use field_grid::FieldGrid;
pub use kinetics::{KineticsSystem, resolve_collision};

use crate::config::SimConfig;
use crate::simulation::Materials;
use crate::world::{Grid, SimStats};

/// Runs the extension's phase of a tick
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Fresh state for a world switching the extension on
    pub fn initialize(grid: &mut Grid, materials: &Materials, config: &SimConfig) -> FieldGrid {
        KineticsSystem::attach(grid, materials);
        let mut field = FieldGrid::new(grid.width(), grid.height(), config.physics.field_cell_size);
        field.update_solid_mask(grid, materials);
        field
    }

    /// Drop all extension state; particle types and temperatures are kept
    pub fn quiesce(grid: &mut Grid) {
        KineticsSystem::detach(grid);
    }

    pub fn step(
        grid: &mut Grid,
        field: &mut FieldGrid,
        materials: &Materials,
        config: &SimConfig,
        stats: &mut dyn SimStats,
    ) {
        // Particles created or transformed since the last tick
        KineticsSystem::attach(grid, materials);

        field.update_solid_mask(grid, materials);
        field.step(&config.physics);
        KineticsSystem::couple(grid, field, materials, &config.physics);

        if config.physics.mass_attraction {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("mass_attraction").entered();

            AttractionField::compute(grid, materials, &config.physics).apply(grid, materials);
        }

        KineticsSystem::integrate(grid, materials, &config.physics, &config.thermal, stats);
    }
}
