//! Coarse pressure/velocity field for the advanced physics extension

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;
use crate::simulation::Materials;
use crate::world::Grid;

/// Pressure and velocity per coarse cell
///
/// One field cell covers `cell_size × cell_size` particle cells. Cells whose
/// whole footprint is occupied by solids act as walls and carry no velocity.
/// The wall mask is derived from the particle grid and rebuilt every step, so
/// it is not serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldGrid {
    cell_size: i32,
    width: i32,
    height: i32,
    pressure: Vec<f32>,
    velocity: Vec<Vec2>,
    #[serde(skip)]
    solid: Vec<bool>,
}

impl FieldGrid {
    /// Zeroed field covering a particle grid of the given size
    pub fn new(grid_width: i32, grid_height: i32, cell_size: u32) -> Self {
        let cell_size = (cell_size.max(1)).min(i32::MAX as u32) as i32;
        let width = (grid_width.max(1) + cell_size - 1) / cell_size;
        let height = (grid_height.max(1) + cell_size - 1) / cell_size;
        let len = (width * height) as usize;
        Self {
            cell_size,
            width,
            height,
            pressure: vec![0.0; len],
            velocity: vec![Vec2::ZERO; len],
            solid: Vec::new(),
        }
    }

    /// Whether a deserialized field is internally consistent and finite
    pub fn is_well_formed(&self) -> bool {
        let Some(len) = self.width.checked_mul(self.height) else {
            return false;
        };
        self.cell_size > 0
            && self.width > 0
            && self.height > 0
            && self.pressure.len() == len as usize
            && self.velocity.len() == len as usize
            && self.pressure.iter().all(|p| p.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
    }

    /// Whether this field covers a particle grid of the given size
    pub fn covers(&self, grid_width: i32, grid_height: i32, cell_size: u32) -> bool {
        let expected = Self::new(grid_width, grid_height, cell_size);
        self.is_well_formed()
            && self.cell_size == expected.cell_size
            && self.width == expected.width
            && self.height == expected.height
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    fn idx(&self, cell: IVec2) -> Option<usize> {
        (cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    /// Index with coordinates clamped to the field edges
    #[inline]
    fn clamped_idx(&self, x: i32, y: i32) -> usize {
        let x = x.clamp(0, self.width - 1);
        let y = y.clamp(0, self.height - 1);
        (y * self.width + x) as usize
    }

    /// Field cell containing a particle position
    pub fn cell_of(&self, pos: IVec2) -> IVec2 {
        IVec2::new(pos.x.div_euclid(self.cell_size), pos.y.div_euclid(self.cell_size))
    }

    /// Center of a field cell in particle coordinates
    pub fn cell_center(&self, cell: IVec2) -> Vec2 {
        (cell.as_vec2() + Vec2::splat(0.5)) * self.cell_size as f32
    }

    pub fn pressure_at(&self, cell: IVec2) -> f32 {
        self.idx(cell).map_or(0.0, |i| self.pressure[i])
    }

    pub fn velocity_at(&self, cell: IVec2) -> Vec2 {
        self.idx(cell).map_or(Vec2::ZERO, |i| self.velocity[i])
    }

    /// Air velocity at a particle position
    pub fn sample_velocity(&self, pos: IVec2) -> Vec2 {
        self.velocity_at(self.cell_of(pos))
    }

    /// Push the air at a particle position
    pub fn add_velocity(&mut self, pos: IVec2, delta: Vec2) {
        if let Some(i) = self.idx(self.cell_of(pos))
            && !self.solid.get(i).copied().unwrap_or(false)
            && delta.is_finite()
        {
            self.velocity[i] += delta;
        }
    }

    pub fn pressure(&self) -> &[f32] {
        &self.pressure
    }

    pub fn velocity(&self) -> &[Vec2] {
        &self.velocity
    }

    /// Largest absolute pressure anywhere in the field
    pub fn max_pressure(&self) -> f32 {
        self.pressure.iter().fold(0.0f32, |m, p| m.max(p.abs()))
    }

    /// Largest speed anywhere in the field
    pub fn max_speed(&self) -> f32 {
        self.velocity.iter().fold(0.0f32, |m, v| m.max(v.length()))
    }

    /// Add a pressure impulse with linear falloff around `center`
    pub fn inject_impulse(&mut self, center: Vec2, radius: f32, strength: f32) {
        if radius <= 0.0 || !radius.is_finite() || !strength.is_finite() || !center.is_finite() {
            return;
        }
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = IVec2::new(x, y);
                let distance = self.cell_center(cell).distance(center);
                // The cell containing the center always receives the full impulse
                let falloff = if self.cell_of(center.floor().as_ivec2()) == cell {
                    1.0
                } else {
                    1.0 - distance / radius
                };
                if falloff > 0.0 {
                    let i = (y * self.width + x) as usize;
                    self.pressure[i] += strength * falloff;
                }
            }
        }
    }

    /// Mark cells fully covered by solid particles
    pub fn update_solid_mask(&mut self, grid: &Grid, materials: &Materials) {
        self.solid.resize(self.pressure.len(), false);
        for cy in 0..self.height {
            for cx in 0..self.width {
                let mut all_solid = true;
                'cell: for y in cy * self.cell_size..(cy + 1) * self.cell_size {
                    for x in cx * self.cell_size..(cx + 1) * self.cell_size {
                        let pos = IVec2::new(x, y);
                        if !grid.in_bounds(pos) {
                            continue;
                        }
                        let solid = grid
                            .get(pos)
                            .is_some_and(|p| materials.get(p.material).behavior.is_solid());
                        if !solid {
                            all_solid = false;
                            break 'cell;
                        }
                    }
                }
                let i = (cy * self.width + cx) as usize;
                self.solid[i] = all_solid;
            }
        }
    }

    /// Advance the field one tick
    ///
    /// velocity -= response * grad(p), then p -= response * div(v), then both
    /// decay. Gradients and divergence use central differences with clamped
    /// edges.
    pub fn step(&mut self, config: &PhysicsConfig) {
        #[cfg(feature = "detailed_profiling")]
        let _span = tracing::info_span!("field_step").entered();

        let w = self.width;
        let h = self.height;
        let solid = |s: &Self, i: usize| s.solid.get(i).copied().unwrap_or(false);

        let mut next_velocity = self.velocity.clone();
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) as usize;
                if solid(self, i) {
                    next_velocity[i] = Vec2::ZERO;
                    continue;
                }
                let grad = Vec2::new(
                    self.pressure[self.clamped_idx(x + 1, y)]
                        - self.pressure[self.clamped_idx(x - 1, y)],
                    self.pressure[self.clamped_idx(x, y + 1)]
                        - self.pressure[self.clamped_idx(x, y - 1)],
                ) * 0.5;
                next_velocity[i] -= grad * config.velocity_response;
            }
        }
        self.velocity = next_velocity;

        let mut next_pressure = self.pressure.clone();
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) as usize;
                let div = (self.velocity[self.clamped_idx(x + 1, y)].x
                    - self.velocity[self.clamped_idx(x - 1, y)].x
                    + self.velocity[self.clamped_idx(x, y + 1)].y
                    - self.velocity[self.clamped_idx(x, y - 1)].y)
                    * 0.5;
                next_pressure[i] -= div * config.pressure_response;
            }
        }
        self.pressure = next_pressure;

        for p in &mut self.pressure {
            *p *= config.field_decay;
            if !p.is_finite() {
                *p = 0.0;
            }
        }
        for v in &mut self.velocity {
            *v *= config.field_decay;
            if !v.is_finite() {
                *v = Vec2::ZERO;
            }
        }
    }
}
