//! Chemistry system for lifetimes, burning, ignition, and neighbor reactions

use glam::IVec2;

use super::transform::{HookEvent, TransformSystem};
use super::{Grid, NeighborQueries, SimStats, WorldRng};
use crate::config::SimConfig;
use crate::simulation::{Materials, Particle, particle_flags};

/// Chance per burning tick of pushing a flame into an empty neighbor
const FLAME_SPAWN_PROBABILITY: f32 = 0.25;

/// Handles the reaction phase: decay, fire, and rule-driven reactions
pub struct ChemistrySystem;

impl ChemistrySystem {
    /// Visit every particle once in the tick's visit order
    pub fn update<R: WorldRng>(
        grid: &mut Grid,
        materials: &Materials,
        config: &SimConfig,
        tick: u64,
        stats: &mut dyn SimStats,
        rng: &mut R,
        hooks: &mut Vec<HookEvent>,
    ) {
        for pos in NeighborQueries::visit_order(grid.width(), grid.height(), tick) {
            let Some(particle) = grid.get(pos) else {
                continue;
            };
            if particle.has_flag(particle_flags::REACTED) {
                continue;
            }

            if Self::update_lifetime(grid, materials, pos, stats, hooks) {
                continue;
            }
            if Self::update_burning(grid, materials, config, pos, stats, rng, hooks) {
                continue;
            }
            Self::check_ignition(grid, materials, pos, stats, rng);
            Self::check_reactions(grid, materials, pos, stats, rng, hooks);
        }
    }

    /// Count down a limited lifetime
    ///
    /// Returns true when the particle decayed or vanished.
    pub fn update_lifetime(
        grid: &mut Grid,
        materials: &Materials,
        pos: IVec2,
        stats: &mut dyn SimStats,
        hooks: &mut Vec<HookEvent>,
    ) -> bool {
        let Some(particle) = grid.get_mut(pos) else {
            return false;
        };
        let Some(lifetime) = materials.get(particle.material).lifetime else {
            return false;
        };

        let remaining = particle.lifetime_remaining() - 1;
        particle.set_lifetime_remaining(remaining);
        if remaining > 0 {
            return false;
        }

        match lifetime.decays_to {
            Some(target) => {
                TransformSystem::transform(grid, materials, pos, target, hooks);
                if let Some(particle) = grid.get_mut(pos) {
                    particle.origin = None;
                }
            }
            None => {
                grid.clear(pos);
            }
        }
        stats.record_state_change();
        true
    }

    /// Advance a burning particle
    ///
    /// Returns true when it burned out.
    pub fn update_burning<R: WorldRng>(
        grid: &mut Grid,
        materials: &Materials,
        config: &SimConfig,
        pos: IVec2,
        stats: &mut dyn SimStats,
        rng: &mut R,
        hooks: &mut Vec<HookEvent>,
    ) -> bool {
        let Some(particle) = grid.get_mut(pos) else {
            return false;
        };
        if !particle.is_burning() {
            return false;
        }
        let Some(flammability) = materials.get(particle.material).flammability else {
            // Material changed under the flag
            particle.clear_flag(particle_flags::BURNING);
            return false;
        };

        let thermal = &config.thermal;
        particle.temperature = (particle.temperature + flammability.burn_heat)
            .clamp(thermal.min_temperature, thermal.max_temperature);
        let remaining = particle.burn_remaining() - 1;
        particle.set_burn_remaining(remaining);

        if let Some(flame) = flammability.emits
            && rng.check_probability(FLAME_SPAWN_PROBABILITY)
        {
            for offset in NeighborQueries::shuffled_orthogonal(rng) {
                let target = pos + offset;
                if grid.is_vacant(target) {
                    let def = materials.get(flame);
                    let temperature = def
                        .default_temperature
                        .unwrap_or(config.ambient_temperature);
                    let mut spawned = Particle::spawn(target, def, temperature);
                    spawned.set_flag(particle_flags::REACTED);
                    if grid.insert(target, spawned).is_ok() {
                        break;
                    }
                }
            }
        }

        if remaining > 0 {
            return false;
        }

        match flammability.burns_to {
            Some(residue) => {
                TransformSystem::transform(grid, materials, pos, residue, hooks);
                if let Some(particle) = grid.get_mut(pos) {
                    particle.origin = None;
                }
            }
            None => {
                grid.clear(pos);
            }
        }
        stats.record_state_change();
        true
    }

    /// Set a flammable particle alight when it is hot enough or touches a
    /// flame
    pub fn check_ignition<R: WorldRng>(
        grid: &mut Grid,
        materials: &Materials,
        pos: IVec2,
        stats: &mut dyn SimStats,
        rng: &mut R,
    ) -> bool {
        let Some(particle) = grid.get(pos) else {
            return false;
        };
        if particle.is_burning() {
            return false;
        }
        let Some(flammability) = materials.get(particle.material).flammability else {
            return false;
        };

        let hot = particle.temperature > flammability.ignition_temp;
        let touching_flame = NeighborQueries::any_orthogonal(grid, pos, |neighbor| {
            neighbor.is_burning() || materials.get(neighbor.material).flame
        });
        if !(hot || touching_flame) || !rng.check_probability(flammability.ignition_probability) {
            return false;
        }

        if let Some(particle) = grid.get_mut(pos) {
            particle.set_flag(particle_flags::BURNING);
            particle.set_burn_remaining(i32::from(flammability.burn_duration.max(1)));
        }
        log::trace!("Ignition at {pos}");
        stats.record_state_change();
        true
    }

    /// Evaluate reaction rules against the orthogonal neighbors
    ///
    /// Neighbors are tried in a random order and each qualifying one is
    /// rolled independently; the first success fires and ends the search.
    /// Both participants are marked so neither reacts again this tick.
    pub fn check_reactions<R: WorldRng>(
        grid: &mut Grid,
        materials: &Materials,
        pos: IVec2,
        stats: &mut dyn SimStats,
        rng: &mut R,
        hooks: &mut Vec<HookEvent>,
    ) -> bool {
        let Some(particle) = grid.get(pos) else {
            return false;
        };
        if particle.has_flag(particle_flags::REACTED) {
            return false;
        }
        let material = particle.material;
        let temperature = particle.temperature;
        let charged = particle.electric.is_charged();
        let reactions = materials.reactions();

        for offset in NeighborQueries::shuffled_orthogonal(rng) {
            let neighbor_pos = pos + offset;
            let Some(neighbor) = grid.get(neighbor_pos) else {
                continue;
            };
            if neighbor.has_flag(particle_flags::REACTED) {
                continue;
            }
            let Some(rule) = reactions.find_reaction(material, neighbor.material, temperature, charged)
            else {
                continue;
            };
            if rule.is_noop() || !rng.check_probability(rule.probability) {
                continue;
            }

            for target in [pos, neighbor_pos] {
                if let Some(p) = grid.get_mut(target) {
                    p.set_flag(particle_flags::REACTED);
                }
            }
            TransformSystem::apply_outcome(grid, materials, pos, rule.self_becomes, hooks);
            TransformSystem::apply_outcome(grid, materials, neighbor_pos, rule.neighbor_becomes, hooks);
            if let Some(hook) = rule.hook {
                hooks.push(HookEvent {
                    position: pos,
                    hook,
                });
            }
            log::trace!("Reaction `{}` at {pos}", rule.name);
            stats.record_reaction();
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{MaterialId, ReactionHook};
    use crate::world::{NoopStats, TickCounters};

    /// RNG whose probability checks always pass or always fail
    struct TestRng {
        succeed: bool,
    }

    impl WorldRng for TestRng {
        fn gen_bool(&mut self) -> bool {
            true
        }

        fn gen_f32(&mut self) -> f32 {
            0.5
        }

        fn check_probability(&mut self, _probability: f32) -> bool {
            self.succeed
        }

        fn gen_range_usize(&mut self, upper: usize) -> usize {
            upper.saturating_sub(1)
        }
    }

    fn place(grid: &mut Grid, materials: &Materials, x: i32, y: i32, material: MaterialId, temperature: f32) {
        let pos = IVec2::new(x, y);
        grid.set(pos, Particle::spawn(pos, materials.get(material), temperature))
            .unwrap();
    }

    fn material_at(grid: &Grid, x: i32, y: i32) -> Option<MaterialId> {
        grid.get(IVec2::new(x, y)).map(|p| p.material)
    }

    #[test]
    fn test_quench_transforms_both() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(3, 3);
        place(&mut grid, &materials, 1, 1, MaterialId::WATER, 20.0);
        place(&mut grid, &materials, 1, 0, MaterialId::LAVA, 1300.0);

        let mut stats = TickCounters::default();
        let mut hooks = Vec::new();
        assert!(ChemistrySystem::check_reactions(
            &mut grid,
            &materials,
            IVec2::new(1, 1),
            &mut stats,
            &mut TestRng { succeed: true },
            &mut hooks
        ));
        assert_eq!(material_at(&grid, 1, 1), Some(MaterialId::STEAM));
        assert_eq!(material_at(&grid, 1, 0), Some(MaterialId::STONE));
        assert_eq!(stats.reactions, 1);

        // Both are spent for this tick
        assert!(!ChemistrySystem::check_reactions(
            &mut grid,
            &materials,
            IVec2::new(1, 0),
            &mut stats,
            &mut TestRng { succeed: true },
            &mut hooks
        ));
    }

    #[test]
    fn test_failed_roll_changes_nothing() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(3, 3);
        place(&mut grid, &materials, 1, 1, MaterialId::WATER, 20.0);
        place(&mut grid, &materials, 1, 0, MaterialId::LAVA, 1300.0);
        let before: Vec<Particle> = grid.iter().cloned().collect();

        for _ in 0..5 {
            assert!(!ChemistrySystem::check_reactions(
                &mut grid,
                &materials,
                IVec2::new(1, 1),
                &mut NoopStats,
                &mut TestRng { succeed: false },
                &mut Vec::new()
            ));
        }
        let after: Vec<Particle> = grid.iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_charge_gated_reaction() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(3, 1);
        place(&mut grid, &materials, 0, 0, MaterialId::WIRE, 20.0);
        place(&mut grid, &materials, 1, 0, MaterialId::GUNPOWDER, 20.0);
        let mut rng = TestRng { succeed: true };

        assert!(!ChemistrySystem::check_reactions(
            &mut grid,
            &materials,
            IVec2::ZERO,
            &mut NoopStats,
            &mut rng,
            &mut Vec::new()
        ));

        grid.get_mut(IVec2::ZERO).unwrap().electric.charge = 2;
        assert!(ChemistrySystem::check_reactions(
            &mut grid,
            &materials,
            IVec2::ZERO,
            &mut NoopStats,
            &mut rng,
            &mut Vec::new()
        ));
        assert_eq!(material_at(&grid, 1, 0), Some(MaterialId::FIRE));
        assert_eq!(material_at(&grid, 0, 0), Some(MaterialId::WIRE));
    }

    #[test]
    fn test_corrosion_queues_fumes() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(3, 3);
        place(&mut grid, &materials, 1, 1, MaterialId::ACID, 20.0);
        place(&mut grid, &materials, 1, 0, MaterialId::METAL, 20.0);
        let mut hooks = Vec::new();

        ChemistrySystem::check_reactions(
            &mut grid,
            &materials,
            IVec2::new(1, 1),
            &mut NoopStats,
            &mut TestRng { succeed: true },
            &mut hooks,
        );
        assert_eq!(grid.particle_count(), 0);
        assert_eq!(
            hooks,
            vec![HookEvent {
                position: IVec2::new(1, 1),
                hook: ReactionHook::SpawnAbove(MaterialId::SMOKE),
            }]
        );
    }

    #[test]
    fn test_lifetime_decays() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(1, 1);
        place(&mut grid, &materials, 0, 0, MaterialId::FIRE, 800.0);
        grid.get_mut(IVec2::ZERO).unwrap().set_lifetime_remaining(2);

        let mut hooks = Vec::new();
        assert!(!ChemistrySystem::update_lifetime(&mut grid, &materials, IVec2::ZERO, &mut NoopStats, &mut hooks));
        assert!(ChemistrySystem::update_lifetime(&mut grid, &materials, IVec2::ZERO, &mut NoopStats, &mut hooks));
        assert_eq!(material_at(&grid, 0, 0), Some(MaterialId::SMOKE));
    }

    #[test]
    fn test_wood_ignites_next_to_fire_and_burns_out() {
        let materials = Materials::builtin();
        let config = SimConfig::default();
        let mut grid = Grid::new(3, 1);
        place(&mut grid, &materials, 0, 0, MaterialId::FIRE, 800.0);
        place(&mut grid, &materials, 1, 0, MaterialId::WOOD, 20.0);
        let mut rng = TestRng { succeed: true };

        assert!(ChemistrySystem::check_ignition(&mut grid, &materials, IVec2::new(1, 0), &mut NoopStats, &mut rng));
        assert!(grid.get(IVec2::new(1, 0)).unwrap().is_burning());

        let mut hooks = Vec::new();
        let mut burned_out = false;
        for _ in 0..200 {
            if ChemistrySystem::update_burning(&mut grid, &materials, &config, IVec2::new(1, 0), &mut NoopStats, &mut rng, &mut hooks) {
                burned_out = true;
                break;
            }
        }
        assert!(burned_out);
        let ash = grid.get(IVec2::new(1, 0)).unwrap();
        assert_eq!(ash.material, MaterialId::ASH);
        assert!(!ash.is_burning());
        // The flame went into the only free neighbor
        assert_eq!(material_at(&grid, 2, 0), Some(MaterialId::FIRE));
    }

    #[test]
    fn test_cold_wood_stays_unlit() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(2, 1);
        place(&mut grid, &materials, 0, 0, MaterialId::WOOD, 20.0);
        place(&mut grid, &materials, 1, 0, MaterialId::STONE, 20.0);

        assert!(!ChemistrySystem::check_ignition(
            &mut grid,
            &materials,
            IVec2::ZERO,
            &mut NoopStats,
            &mut TestRng { succeed: true }
        ));
    }
}
