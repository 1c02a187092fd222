//! Grid-approximated mass attraction
//!
//! Mass is summed per coarse cell and every cell is pulled toward the other
//! cells within `attraction_radius` (in coarse cells):
//!
//! ```text
//! a_i = Σ_j strength · m_j · d̂_ij / (|d_ij|² + softening)
//! ```
//!
//! The result is added to the velocity of particles whose material
//! gravitates.

use glam::{IVec2, Vec2};

use crate::config::PhysicsConfig;
use crate::simulation::Materials;
use crate::world::Grid;

/// Per-cell mass and the resulting attraction
#[derive(Clone, Debug)]
pub struct AttractionField {
    cell_size: i32,
    width: i32,
    height: i32,
    mass: Vec<f32>,
    acceleration: Vec<Vec2>,
}

impl AttractionField {
    /// Sum particle mass per cell and compute the attraction of every cell
    pub fn compute(grid: &Grid, materials: &Materials, config: &PhysicsConfig) -> Self {
        let cell_size = config.field_cell_size.max(1) as i32;
        let width = (grid.width().max(1) + cell_size - 1) / cell_size;
        let height = (grid.height().max(1) + cell_size - 1) / cell_size;
        let len = (width * height) as usize;

        let mut mass = vec![0.0f32; len];
        for particle in grid.iter() {
            let density = materials.get(particle.material).density;
            if !density.is_finite() || density <= 0.0 {
                continue;
            }
            let cell = IVec2::new(
                particle.position.x / cell_size,
                particle.position.y / cell_size,
            );
            mass[(cell.y * width + cell.x) as usize] += density;
        }

        let mut field = Self {
            cell_size,
            width,
            height,
            mass,
            acceleration: vec![Vec2::ZERO; len],
        };
        field.solve(config);
        field
    }

    fn solve(&mut self, config: &PhysicsConfig) {
        let reach = config.attraction_radius.max(0);
        let radius = reach as f32;
        let softening = config.attraction_softening.max(1.0e-3);

        for y in 0..self.height {
            for x in 0..self.width {
                let mut total = Vec2::ZERO;
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (ox, oy) = (x + dx, y + dy);
                        if ox < 0 || oy < 0 || ox >= self.width || oy >= self.height {
                            continue;
                        }
                        let other_mass = self.mass[(oy * self.width + ox) as usize];
                        if other_mass == 0.0 {
                            continue;
                        }
                        let d = Vec2::new(dx as f32, dy as f32);
                        let distance = d.length();
                        if distance > radius {
                            continue;
                        }
                        total += d / distance * (config.attraction_strength * other_mass
                            / (distance * distance + softening));
                    }
                }
                self.acceleration[(y * self.width + x) as usize] =
                    if total.is_finite() { total } else { Vec2::ZERO };
            }
        }
    }

    pub fn mass_at(&self, cell: IVec2) -> f32 {
        self.cell_index(cell).map_or(0.0, |i| self.mass[i])
    }

    /// Attraction felt at a particle position
    pub fn acceleration_at(&self, pos: IVec2) -> Vec2 {
        let cell = IVec2::new(pos.x.div_euclid(self.cell_size), pos.y.div_euclid(self.cell_size));
        self.cell_index(cell).map_or(Vec2::ZERO, |i| self.acceleration[i])
    }

    /// Add the attraction to every gravitating particle's velocity
    pub fn apply(&self, grid: &mut Grid, materials: &Materials) {
        for particle in grid.iter_mut() {
            if !materials.get(particle.material).gravitates {
                continue;
            }
            let accel = self.acceleration_at(particle.position);
            if let Some(kinetics) = particle.kinetics.as_mut() {
                kinetics.velocity += accel;
            }
        }
    }

    fn cell_index(&self, cell: IVec2) -> Option<usize> {
        (cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }
}
