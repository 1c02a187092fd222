//! Read-only export of world state for rendering and persistence

use serde::{Deserialize, Serialize};

use super::Grid;
use crate::error::{SimError, SimResult};
use crate::physics::FieldGrid;
use crate::simulation::Particle;

/// Every particle plus the field grid, detached from the live world
///
/// The RNG state is not captured; a restored world reseeds from its config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridState {
    pub width: u32,
    pub height: u32,
    pub tick: u64,
    pub advanced_physics: bool,
    /// Occupied slots in row-major order
    pub particles: Vec<Particle>,
    pub field: Option<FieldGrid>,
}

impl GridState {
    pub fn capture(grid: &Grid, tick: u64, field: Option<&FieldGrid>) -> Self {
        Self {
            width: grid.width() as u32,
            height: grid.height() as u32,
            tick,
            advanced_physics: field.is_some(),
            particles: grid.iter().cloned().collect(),
            field: field.cloned(),
        }
    }

    /// Rebuild a particle grid, rejecting out-of-bounds or doubled slots
    pub fn to_grid(&self) -> SimResult<Grid> {
        let mut grid = Grid::new(self.width, self.height);
        for particle in &self.particles {
            let kinetics_finite = particle
                .kinetics
                .is_none_or(|k| k.velocity.is_finite() && k.offset.is_finite());
            if !particle.temperature.is_finite() || !kinetics_finite {
                return Err(SimError::NotFinite {
                    x: particle.position.x,
                    y: particle.position.y,
                });
            }
            grid.insert(particle.position, particle.clone())?;
        }
        Ok(grid)
    }

    pub fn to_bytes(&self) -> SimResult<Vec<u8>> {
        bincode_next::serde::encode_to_vec(self, bincode_next::config::standard())
            .map_err(|e| SimError::Snapshot(format!("failed to encode: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> SimResult<Self> {
        let (state, _) =
            bincode_next::serde::decode_from_slice(bytes, bincode_next::config::standard())
                .map_err(|e| SimError::Snapshot(format!("failed to decode: {e}")))?;
        Ok(state)
    }

    pub fn particle_at(&self, x: i32, y: i32) -> Option<&Particle> {
        self.particles
            .iter()
            .find(|p| p.position.x == x && p.position.y == y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::MaterialId;
    use glam::{IVec2, Vec2};

    fn sample_grid() -> Grid {
        let mut grid = Grid::new(4, 3);
        for (x, y, material) in [(0, 0, MaterialId::STONE), (2, 1, MaterialId::WATER)] {
            let pos = IVec2::new(x, y);
            grid.set(pos, Particle::new(pos, material, 42.0)).unwrap();
        }
        grid
    }

    #[test]
    fn test_bytes_preserve_state() {
        let grid = sample_grid();
        let field = FieldGrid::new(4, 3, 2);
        let state = GridState::capture(&grid, 17, Some(&field));

        let restored = GridState::from_bytes(&state.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, state);
        assert!(restored.advanced_physics);
        assert_eq!(restored.particle_at(2, 1).unwrap().material, MaterialId::WATER);
    }

    #[test]
    fn test_rebuilt_grid_is_consistent() {
        let state = GridState::capture(&sample_grid(), 0, None);
        let grid = state.to_grid().unwrap();

        assert_eq!(grid.particle_count(), 2);
        grid.check_consistency().unwrap();
    }

    #[test]
    fn test_rejects_doubled_slot() {
        let mut state = GridState::capture(&sample_grid(), 0, None);
        let duplicate = state.particles[0].clone();
        state.particles.push(duplicate);

        assert!(matches!(state.to_grid(), Err(SimError::SlotOccupied { .. })));
    }

    #[test]
    fn test_rejects_non_finite_kinetics() {
        use crate::simulation::Kinetics;

        let mut state = GridState::capture(&sample_grid(), 0, None);
        state.particles[1].kinetics = Some(Kinetics {
            velocity: Vec2::new(f32::INFINITY, 0.0),
            offset: Vec2::ZERO,
        });

        assert!(matches!(state.to_grid(), Err(SimError::NotFinite { x: 2, y: 1 })));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(matches!(
            GridState::from_bytes(&[0xff, 0xff, 0xff]),
            Err(SimError::Snapshot(_))
        ));
    }
}
