//! In-place material changes and the procedural hooks they trigger

use glam::{IVec2, Vec2};

use super::{Grid, ORTHOGONAL};
use crate::config::SimConfig;
use crate::physics::FieldGrid;
use crate::simulation::{MaterialId, Materials, Outcome, Particle, ReactionHook, particle_flags};

/// A hook waiting to run at the end of the current phase
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HookEvent {
    pub position: IVec2,
    pub hook: ReactionHook,
}

/// Material transformation helpers shared by every phase
pub struct TransformSystem;

impl TransformSystem {
    /// Change the particle at `pos` into `target`, queueing the target's
    /// transform hook
    ///
    /// Unknown targets resolve to the fallback material. Returns false when
    /// the slot is empty.
    pub fn transform(
        grid: &mut Grid,
        materials: &Materials,
        pos: IVec2,
        target: MaterialId,
        hooks: &mut Vec<HookEvent>,
    ) -> bool {
        let def = materials.get(target);
        let Some(particle) = grid.get_mut(pos) else {
            return false;
        };
        particle.transform_into(def);
        if let Some(hook) = def.on_transform {
            hooks.push(HookEvent {
                position: pos,
                hook,
            });
        }
        true
    }

    /// Apply one side of a reaction
    ///
    /// Reaction products never remember what they were made from.
    pub fn apply_outcome(
        grid: &mut Grid,
        materials: &Materials,
        pos: IVec2,
        outcome: Outcome,
        hooks: &mut Vec<HookEvent>,
    ) -> bool {
        match outcome {
            Outcome::Unchanged => false,
            Outcome::Destroy => grid.clear(pos).is_some(),
            Outcome::Become(target) => {
                let changed = Self::transform(grid, materials, pos, target, hooks);
                if let Some(particle) = grid.get_mut(pos) {
                    particle.origin = None;
                }
                changed
            }
        }
    }

    /// Run and drain queued hooks
    ///
    /// Hooks only add particles or heat, so they never queue further hooks.
    pub fn apply_hooks(
        grid: &mut Grid,
        mut field: Option<&mut FieldGrid>,
        materials: &Materials,
        config: &SimConfig,
        hooks: &mut Vec<HookEvent>,
    ) {
        for event in hooks.drain(..) {
            match event.hook {
                ReactionHook::SpawnAbove(material) => {
                    Self::spawn_above(grid, materials, config, event.position, material);
                }
                ReactionHook::Heat(amount) => {
                    Self::heat_cross(grid, config, event.position, amount);
                }
                ReactionHook::Explode { radius, strength } => {
                    Self::explode(grid, field.as_deref_mut(), config, event.position, radius, strength);
                }
            }
        }
    }

    fn spawn_above(
        grid: &mut Grid,
        materials: &Materials,
        config: &SimConfig,
        pos: IVec2,
        material: MaterialId,
    ) {
        let above = pos + IVec2::Y;
        if !grid.is_vacant(above) {
            return;
        }
        let def = materials.get(material);
        let temperature = def
            .default_temperature
            .unwrap_or(config.ambient_temperature);
        let mut particle = Particle::spawn(above, def, temperature);
        particle.set_flag(particle_flags::REACTED);
        if grid.insert(above, particle).is_err() {
            log::trace!("Spawn above {pos} lost its slot");
        }
    }

    fn heat_cross(grid: &mut Grid, config: &SimConfig, pos: IVec2, amount: f32) {
        if !amount.is_finite() {
            return;
        }
        let thermal = &config.thermal;
        for target in std::iter::once(pos).chain(ORTHOGONAL.iter().map(|o| pos + *o)) {
            if let Some(particle) = grid.get_mut(target) {
                particle.temperature = (particle.temperature + amount)
                    .clamp(thermal.min_temperature, thermal.max_temperature);
            }
        }
    }

    /// Heat everything within `radius` and push the air outward
    ///
    /// The heat falls off linearly from the center. Phase transitions are
    /// left to the next thermal pass.
    pub fn explode(
        grid: &mut Grid,
        field: Option<&mut FieldGrid>,
        config: &SimConfig,
        pos: IVec2,
        radius: f32,
        strength: f32,
    ) {
        if radius <= 0.0 || !radius.is_finite() || !strength.is_finite() {
            return;
        }
        let center = pos.as_vec2() + Vec2::splat(0.5);
        if let Some(field) = field {
            field.inject_impulse(center, radius, strength);
        }

        let thermal = &config.thermal;
        // Window clamped to the grid; `as` saturates huge radii
        let reach = radius.ceil() as i32;
        let min_x = pos.x.saturating_sub(reach).max(0);
        let max_x = pos.x.saturating_add(reach).min(grid.width() - 1);
        let min_y = pos.y.saturating_sub(reach).max(0);
        let max_y = pos.y.saturating_add(reach).min(grid.height() - 1);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let target = IVec2::new(x, y);
                let distance = (target - pos).as_vec2().length();
                let falloff = 1.0 - distance / radius;
                if falloff <= 0.0 {
                    continue;
                }
                if let Some(particle) = grid.get_mut(target) {
                    let heat = strength * falloff * thermal.explosion_heat_scale;
                    particle.temperature = (particle.temperature + heat)
                        .clamp(thermal.min_temperature, thermal.max_temperature);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(grid: &mut Grid, x: i32, y: i32, material: MaterialId) {
        let pos = IVec2::new(x, y);
        grid.set(pos, Particle::new(pos, material, 20.0)).unwrap();
    }

    #[test]
    fn test_transform_queues_target_hook() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(4, 4);
        place(&mut grid, 1, 1, MaterialId::GUNPOWDER);
        let mut hooks = Vec::new();

        assert!(TransformSystem::transform(
            &mut grid,
            &materials,
            IVec2::new(1, 1),
            MaterialId::BLAST,
            &mut hooks
        ));
        assert_eq!(grid.get(IVec2::new(1, 1)).unwrap().material, MaterialId::BLAST);
        assert_eq!(hooks.len(), 1);
        assert!(matches!(hooks[0].hook, ReactionHook::Explode { .. }));
    }

    #[test]
    fn test_outcome_clears_origin() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(2, 2);
        place(&mut grid, 0, 0, MaterialId::LAVA);
        grid.get_mut(IVec2::ZERO).unwrap().origin = Some(MaterialId::GLASS);
        let mut hooks = Vec::new();

        TransformSystem::apply_outcome(
            &mut grid,
            &materials,
            IVec2::ZERO,
            Outcome::Become(MaterialId::STONE),
            &mut hooks,
        );
        let particle = grid.get(IVec2::ZERO).unwrap();
        assert_eq!(particle.material, MaterialId::STONE);
        assert_eq!(particle.origin, None);

        assert!(TransformSystem::apply_outcome(
            &mut grid,
            &materials,
            IVec2::ZERO,
            Outcome::Destroy,
            &mut hooks
        ));
        assert!(grid.get(IVec2::ZERO).is_none());
    }

    #[test]
    fn test_spawn_above_needs_room() {
        let materials = Materials::builtin();
        let config = SimConfig::default();
        let mut grid = Grid::new(3, 3);
        let mut hooks = vec![
            HookEvent {
                position: IVec2::new(0, 0),
                hook: ReactionHook::SpawnAbove(MaterialId::SMOKE),
            },
            HookEvent {
                position: IVec2::new(2, 2),
                hook: ReactionHook::SpawnAbove(MaterialId::SMOKE),
            },
        ];

        TransformSystem::apply_hooks(&mut grid, None, &materials, &config, &mut hooks);
        assert!(hooks.is_empty());
        assert_eq!(grid.get(IVec2::new(0, 1)).unwrap().material, MaterialId::SMOKE);
        assert_eq!(grid.particle_count(), 1);
        grid.check_consistency().unwrap();
    }

    #[test]
    fn test_explosion_heats_with_falloff() {
        let config = SimConfig::default();
        let mut grid = Grid::new(16, 1);
        for x in 0..16 {
            place(&mut grid, x, 0, MaterialId::STONE);
        }
        let mut field = FieldGrid::new(16, 1, 4);

        TransformSystem::explode(&mut grid, Some(&mut field), &config, IVec2::new(0, 0), 6.0, 40.0);

        let t0 = grid.get(IVec2::new(0, 0)).unwrap().temperature;
        let t3 = grid.get(IVec2::new(3, 0)).unwrap().temperature;
        let t10 = grid.get(IVec2::new(10, 0)).unwrap().temperature;
        assert!(t0 > t3 && t3 > 20.0);
        assert_eq!(t10, 20.0);
        assert!(field.max_pressure() > 0.0);
    }

    #[test]
    fn test_huge_explosion_radius_stays_inside_grid() {
        let config = SimConfig::default();
        let mut grid = Grid::new(16, 16);
        place(&mut grid, 0, 0, MaterialId::STONE);
        place(&mut grid, 15, 15, MaterialId::STONE);

        TransformSystem::explode(&mut grid, None, &config, IVec2::new(8, 8), 1.0e5, 10.0);
        TransformSystem::explode(&mut grid, None, &config, IVec2::new(8, 8), f32::MAX, 10.0);

        assert!(grid.get(IVec2::new(0, 0)).unwrap().temperature > 20.0);
        assert!(grid.get(IVec2::new(15, 15)).unwrap().temperature > 20.0);
    }

    #[test]
    fn test_heat_hook_reaches_orthogonal_neighbors() {
        let materials = Materials::builtin();
        let config = SimConfig::default();
        let mut grid = Grid::new(3, 3);
        for (x, y) in [(1, 1), (1, 2), (0, 0)] {
            place(&mut grid, x, y, MaterialId::STONE);
        }
        let mut hooks = vec![HookEvent {
            position: IVec2::new(1, 1),
            hook: ReactionHook::Heat(50.0),
        }];

        TransformSystem::apply_hooks(&mut grid, None, &materials, &config, &mut hooks);
        assert_eq!(grid.get(IVec2::new(1, 1)).unwrap().temperature, 70.0);
        assert_eq!(grid.get(IVec2::new(1, 2)).unwrap().temperature, 70.0);
        assert_eq!(grid.get(IVec2::new(0, 0)).unwrap().temperature, 20.0);
    }
}
