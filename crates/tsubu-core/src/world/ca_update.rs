//! Cellular automata update logic - material movement physics

use glam::IVec2;

use super::{Grid, NeighborQueries, SimStats, WorldRng};
use crate::config::BehaviorConfig;
use crate::simulation::{
    BehaviorCategory, CustomBehavior, Materials, MotionContext, Scratch, particle_flags,
};

/// Which occupants a move may displace
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Displacement {
    /// Only empty cells
    None,
    /// Fluids strictly lighter than the mover (falling)
    Sink,
    /// Gases strictly denser than the mover (rising)
    Rise,
}

/// Cellular automata updater - handles material movement physics
pub struct CellularAutomataUpdater;

impl CellularAutomataUpdater {
    /// Run the behavior pass over the whole grid
    pub fn update<R: WorldRng>(
        grid: &mut Grid,
        materials: &Materials,
        config: &BehaviorConfig,
        tick: u64,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) {
        for pos in NeighborQueries::visit_order(grid.width(), grid.height(), tick) {
            let Some(particle) = grid.get(pos) else {
                continue;
            };
            if particle.has_flag(particle_flags::MOVED) {
                continue;
            }

            match materials.get(particle.material).behavior {
                BehaviorCategory::Solid => {
                    // Solids don't move
                }
                BehaviorCategory::Powder => {
                    Self::update_powder(grid, pos, materials, stats, rng);
                }
                BehaviorCategory::Liquid => {
                    Self::update_liquid(grid, pos, materials, config, stats, rng);
                }
                BehaviorCategory::Gas => {
                    Self::update_gas(grid, pos, materials, config, stats, rng);
                }
                BehaviorCategory::Custom(custom) => {
                    Self::update_custom(grid, pos, custom, materials, stats, rng);
                }
            }
        }
    }

    /// Update powder material (falls down, disperses diagonally)
    pub fn update_powder<R: WorldRng>(
        grid: &mut Grid,
        pos: IVec2,
        materials: &Materials,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> bool {
        // Try to move down
        if Self::try_move(grid, pos, IVec2::new(0, -1), Displacement::Sink, materials, stats) {
            return true;
        }

        // Try diagonal dispersal (random direction)
        let dx = if rng.gen_bool() { -1 } else { 1 };
        if Self::try_move(grid, pos, IVec2::new(dx, -1), Displacement::Sink, materials, stats) {
            return true;
        }

        // Try opposite diagonal
        Self::try_move(grid, pos, IVec2::new(-dx, -1), Displacement::Sink, materials, stats)
    }

    /// Update liquid material (falls, then flows sideways)
    pub fn update_liquid<R: WorldRng>(
        grid: &mut Grid,
        pos: IVec2,
        materials: &Materials,
        config: &BehaviorConfig,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> bool {
        // Powder rules first: down, then both diagonals
        if Self::update_powder(grid, pos, materials, stats, rng) {
            return true;
        }

        let viscosity = grid
            .get(pos)
            .map_or(0.0, |p| materials.get(p.material).viscosity)
            .clamp(0.0, 1.0);
        let reach = ((config.max_liquid_spread as f32 * (1.0 - viscosity)).round() as i32).max(1);

        // Flow horizontally (random direction first)
        let dx = if rng.gen_bool() { -1 } else { 1 };
        Self::spread(grid, pos, dx, reach, stats) || Self::spread(grid, pos, -dx, reach, stats)
    }

    /// Slide through empty cells up to `reach` steps, stopping early over a drop
    fn spread(grid: &mut Grid, pos: IVec2, dx: i32, reach: i32, stats: &mut dyn SimStats) -> bool {
        let mut target = pos;
        for _ in 0..reach {
            let next = target + IVec2::new(dx, 0);
            if !grid.is_vacant(next) {
                break;
            }
            target = next;
            if grid.is_vacant(target + IVec2::new(0, -1)) {
                break;
            }
        }
        if target == pos {
            return false;
        }
        Self::commit_move(grid, pos, target, stats)
    }

    /// Update gas material (rises up, disperses toward open space)
    pub fn update_gas<R: WorldRng>(
        grid: &mut Grid,
        pos: IVec2,
        materials: &Materials,
        config: &BehaviorConfig,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> bool {
        // Try to move up
        if Self::try_move(grid, pos, IVec2::new(0, 1), Displacement::Rise, materials, stats) {
            return true;
        }

        // Try diagonal up (random direction)
        let dx = if rng.gen_bool() { -1 } else { 1 };
        if Self::try_move(grid, pos, IVec2::new(dx, 1), Displacement::Rise, materials, stats) {
            return true;
        }
        if Self::try_move(grid, pos, IVec2::new(-dx, 1), Displacement::Rise, materials, stats) {
            return true;
        }

        // Lateral dispersal, weighted toward emptier neighborhoods
        let candidates = [
            IVec2::new(-1, 0),
            IVec2::new(1, 0),
            IVec2::new(-1, -1),
            IVec2::new(1, -1),
            IVec2::new(0, -1),
        ];
        let mut weights = [0.0f32; 5];
        let mut total = 0.0;
        for (weight, offset) in weights.iter_mut().zip(candidates) {
            let target = pos + offset;
            if grid.is_vacant(target) {
                let crowd = NeighborQueries::count_occupied(grid, target, config.gas_spread_radius);
                *weight = 1.0 / (1.0 + crowd as f32);
                total += *weight;
            }
        }
        if total <= 0.0 {
            return false;
        }

        let mut roll = rng.gen_f32() * total;
        for (weight, offset) in weights.iter().zip(candidates) {
            if *weight <= 0.0 {
                continue;
            }
            if roll < *weight {
                return Self::commit_move(grid, pos, pos + offset, stats);
            }
            roll -= weight;
        }
        // Rounding left the roll past the last weight
        match weights.iter().rposition(|w| *w > 0.0) {
            Some(last) => Self::commit_move(grid, pos, pos + candidates[last], stats),
            None => false,
        }
    }

    /// Hand the particle to its material's motion function
    pub fn update_custom<R: WorldRng>(
        grid: &mut Grid,
        pos: IVec2,
        custom: CustomBehavior,
        materials: &Materials,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> bool {
        let mut ctx = CustomMotion {
            grid,
            materials,
            stats,
            rng,
            position: pos,
            moved: false,
            spare: Scratch::default(),
        };
        custom.run(&mut ctx);
        ctx.moved
    }

    /// Try to move a particle by `offset`
    /// Returns true if the move succeeded
    pub fn try_move(
        grid: &mut Grid,
        from: IVec2,
        offset: IVec2,
        displacement: Displacement,
        materials: &Materials,
        stats: &mut dyn SimStats,
    ) -> bool {
        let to = from + offset;
        if !grid.in_bounds(to) {
            return false;
        }
        let Some(src) = grid.get(from) else {
            return false;
        };
        let Some(dst) = grid.get(to) else {
            return Self::commit_move(grid, from, to, stats);
        };

        // An occupant that already moved this tick stays put
        if dst.has_flag(particle_flags::MOVED) {
            return false;
        }

        let src_material = materials.get(src.material);
        let dst_material = materials.get(dst.material);
        let can_displace = match displacement {
            Displacement::None => false,
            Displacement::Sink => {
                dst_material.behavior.is_fluid() && dst_material.density < src_material.density
            }
            Displacement::Rise => {
                dst_material.behavior == BehaviorCategory::Gas
                    && dst_material.density > src_material.density
            }
        };
        if !can_displace {
            return false;
        }

        if grid.swap(from, to).is_err() {
            return false;
        }
        for pos in [from, to] {
            if let Some(p) = grid.get_mut(pos) {
                p.set_flag(particle_flags::MOVED);
            }
        }
        stats.record_particle_moved();
        true
    }

    fn commit_move(grid: &mut Grid, from: IVec2, to: IVec2, stats: &mut dyn SimStats) -> bool {
        if grid.move_particle(from, to).is_err() {
            return false;
        }
        if let Some(p) = grid.get_mut(to) {
            p.set_flag(particle_flags::MOVED);
        }
        stats.record_particle_moved();
        true
    }
}

/// Motion context for custom behaviors; allows a single move
struct CustomMotion<'a, R: WorldRng> {
    grid: &'a mut Grid,
    materials: &'a Materials,
    stats: &'a mut dyn SimStats,
    rng: &'a mut R,
    position: IVec2,
    moved: bool,
    spare: Scratch,
}

impl<R: WorldRng> MotionContext for CustomMotion<'_, R> {
    fn position(&self) -> IVec2 {
        self.position
    }

    fn is_empty(&self, dx: i32, dy: i32) -> bool {
        self.grid.is_vacant(self.position + IVec2::new(dx, dy))
    }

    fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        if self.moved || (dx == 0 && dy == 0) {
            return false;
        }
        let displacement = if dy > 0 {
            Displacement::Rise
        } else {
            Displacement::Sink
        };
        let offset = IVec2::new(dx, dy);
        if CellularAutomataUpdater::try_move(
            self.grid,
            self.position,
            offset,
            displacement,
            self.materials,
            self.stats,
        ) {
            self.position += offset;
            self.moved = true;
            return true;
        }
        false
    }

    fn scratch(&mut self) -> &mut Scratch {
        match self.grid.get_mut(self.position) {
            Some(particle) => &mut particle.scratch,
            None => &mut self.spare,
        }
    }

    fn random_bool(&mut self) -> bool {
        self.rng.gen_bool()
    }

    fn random_f32(&mut self) -> f32 {
        self.rng.gen_f32()
    }
}
