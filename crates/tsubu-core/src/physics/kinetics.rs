//! Particle velocities, air coupling and momentum-conserving collisions

use glam::{IVec2, Vec2};

use super::FieldGrid;
use crate::config::{PhysicsConfig, ThermalConfig};
use crate::simulation::{Kinetics, Materials, Particle};
use crate::world::{Grid, SimStats};

/// Lightest mass used in collisions
const MIN_MASS: f32 = 1.0e-3;

/// Integrates particle velocities for the advanced physics extension
pub struct KineticsSystem;

impl KineticsSystem {
    /// Give every non-solid particle a zero velocity
    pub fn attach(grid: &mut Grid, materials: &Materials) {
        for particle in grid.iter_mut() {
            if particle.kinetics.is_none() && !materials.get(particle.material).behavior.is_solid() {
                particle.kinetics = Some(Kinetics::default());
            }
        }
    }

    /// Drop all velocity state
    pub fn detach(grid: &mut Grid) {
        for particle in grid.iter_mut() {
            particle.kinetics = None;
        }
    }

    /// Exchange momentum between particles and the air they sit in
    pub fn couple(grid: &mut Grid, field: &mut FieldGrid, materials: &Materials, config: &PhysicsConfig) {
        for particle in grid.iter_mut() {
            let pos = particle.position;
            let Some(kinetics) = particle.kinetics.as_mut() else {
                continue;
            };
            let def = materials.get(particle.material);
            let drag = def.air_drag.clamp(0.0, 1.0);
            if drag <= 0.0 {
                continue;
            }
            let delta = (field.sample_velocity(pos) - kinetics.velocity) * drag;
            kinetics.velocity += delta;
            field.add_velocity(pos, -delta * def.density * config.air_coupling);
        }
    }

    /// Move particles cell by cell along their accumulated offset
    pub fn integrate(
        grid: &mut Grid,
        materials: &Materials,
        config: &PhysicsConfig,
        thermal: &ThermalConfig,
        stats: &mut dyn SimStats,
    ) {
        for start in grid.occupied_positions() {
            let Some(mut kinetics) = grid.get(start).and_then(|p| p.kinetics) else {
                continue;
            };

            kinetics.velocity *= config.particle_damping;
            kinetics.velocity = kinetics.velocity.clamp_length_max(config.max_speed);
            if !kinetics.velocity.is_finite() {
                kinetics.velocity = Vec2::ZERO;
            }
            kinetics.offset += kinetics.velocity;

            let mut pos = start;
            while let Some(step) = next_step(kinetics.offset) {
                let target = pos + step;
                if grid.is_vacant(target) && grid.move_particle(pos, target).is_ok() {
                    pos = target;
                    kinetics.offset -= step.as_vec2();
                    continue;
                }

                let axis = if step.x != 0 { 0 } else { 1 };
                let moving_other = grid
                    .get(target)
                    .is_some_and(|other| other.kinetics.is_some());
                if moving_other {
                    Self::collide(grid, materials, config, thermal, pos, target, axis, &mut kinetics, stats);
                } else {
                    Self::reflect(grid, materials, config, thermal, pos, axis, &mut kinetics);
                }
                kinetics.offset[axis] = 0.0;
            }

            if let Some(particle) = grid.get_mut(pos) {
                particle.kinetics = Some(kinetics);
            }
        }
    }

    /// 1-D collision along `axis` between the mover and a moving neighbor
    #[allow(clippy::too_many_arguments)]
    fn collide(
        grid: &mut Grid,
        materials: &Materials,
        config: &PhysicsConfig,
        thermal: &ThermalConfig,
        pos: IVec2,
        target: IVec2,
        axis: usize,
        kinetics: &mut Kinetics,
        stats: &mut dyn SimStats,
    ) {
        let Some(other) = grid.get(target) else {
            return;
        };
        let Some(other_kinetics) = other.kinetics else {
            return;
        };
        let Some(mover) = grid.get(pos) else {
            return;
        };

        let m1 = materials.get(mover.material).density.max(MIN_MASS);
        let m2 = materials.get(other.material).density.max(MIN_MASS);
        let u1 = kinetics.velocity[axis];
        let u2 = other_kinetics.velocity[axis];
        let direction = (target - pos)[axis] as f32;

        // Already separating along this axis
        if (u1 - u2) * direction <= 0.0 {
            return;
        }

        let (v1, v2, lost) = resolve_collision(m1, u1, m2, u2, config.restitution);
        kinetics.velocity[axis] = v1;

        let heat = lost * config.collision_heat_factor * 0.5;
        if let Some(mover) = grid.get_mut(pos) {
            add_collision_heat(mover, materials, thermal, heat);
        }
        if let Some(other) = grid.get_mut(target) {
            if let Some(k) = other.kinetics.as_mut() {
                k.velocity[axis] = v2;
            }
            add_collision_heat(other, materials, thermal, heat);
        }
        stats.record_collision();
    }

    /// Bounce off a static obstacle or the grid edge
    fn reflect(
        grid: &mut Grid,
        materials: &Materials,
        config: &PhysicsConfig,
        thermal: &ThermalConfig,
        pos: IVec2,
        axis: usize,
        kinetics: &mut Kinetics,
    ) {
        let u = kinetics.velocity[axis];
        let e = config.restitution;
        kinetics.velocity[axis] = -e * u;

        if let Some(mover) = grid.get_mut(pos) {
            let mass = materials.get(mover.material).density.max(MIN_MASS);
            let lost = 0.5 * mass * (1.0 - e * e) * u * u;
            add_collision_heat(mover, materials, thermal, lost * config.collision_heat_factor);
        }
    }
}

/// Unit step toward the larger offset component, once it reaches a full cell
fn next_step(offset: Vec2) -> Option<IVec2> {
    let (ax, ay) = (offset.x.abs(), offset.y.abs());
    if ax >= 1.0 && ax >= ay {
        Some(IVec2::new(offset.x.signum() as i32, 0))
    } else if ay >= 1.0 {
        Some(IVec2::new(0, offset.y.signum() as i32))
    } else {
        None
    }
}

/// Velocities after a 1-D collision with restitution `e`, plus the kinetic
/// energy lost
///
/// Momentum `m1*u1 + m2*u2` is conserved exactly.
pub fn resolve_collision(m1: f32, u1: f32, m2: f32, u2: f32, e: f32) -> (f32, f32, f32) {
    let total = m1 + m2;
    let momentum = m1 * u1 + m2 * u2;
    let v1 = (momentum + m2 * e * (u2 - u1)) / total;
    let v2 = (momentum + m1 * e * (u1 - u2)) / total;
    let reduced = m1 * m2 / total;
    let lost = 0.5 * reduced * (1.0 - e * e) * (u1 - u2) * (u1 - u2);
    (v1, v2, lost)
}

fn add_collision_heat(particle: &mut Particle, materials: &Materials, thermal: &ThermalConfig, energy: f32) {
    if energy <= 0.0 || !energy.is_finite() {
        return;
    }
    let capacity = thermal.heat_capacity_of(materials.get(particle.material));
    particle.temperature = (particle.temperature + energy / capacity)
        .clamp(thermal.min_temperature, thermal.max_temperature);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::MaterialId;
    use crate::world::{NoopStats, TickCounters};

    fn moving(pos: IVec2, material: MaterialId, velocity: Vec2) -> Particle {
        let mut particle = Particle::new(pos, material, 20.0);
        particle.kinetics = Some(Kinetics {
            velocity,
            offset: Vec2::ZERO,
        });
        particle
    }

    #[test]
    fn test_resolve_collision_conserves_momentum() {
        let (m1, u1, m2, u2) = (2.0, 3.0, 1.0, -1.0);
        let (v1, v2, lost) = resolve_collision(m1, u1, m2, u2, 0.6);

        assert!((m1 * u1 + m2 * u2 - (m1 * v1 + m2 * v2)).abs() < 1e-5);
        let ke_before = 0.5 * m1 * u1 * u1 + 0.5 * m2 * u2 * u2;
        let ke_after = 0.5 * m1 * v1 * v1 + 0.5 * m2 * v2 * v2;
        assert!((ke_before - ke_after - lost).abs() < 1e-4);
        assert!(lost > 0.0);
    }

    #[test]
    fn test_elastic_collision_swaps_equal_masses() {
        let (v1, v2, lost) = resolve_collision(1.0, 2.0, 1.0, 0.0, 1.0);
        assert!((v1 - 0.0).abs() < 1e-6);
        assert!((v2 - 2.0).abs() < 1e-6);
        assert!(lost.abs() < 1e-6);
    }

    #[test]
    fn test_particle_travels_with_velocity() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(10, 3);
        let start = IVec2::new(1, 1);
        grid.set(start, moving(start, MaterialId::SAND, Vec2::new(2.0, 0.0)))
            .unwrap();

        let config = PhysicsConfig {
            particle_damping: 1.0,
            ..Default::default()
        };
        KineticsSystem::integrate(&mut grid, &materials, &config, &ThermalConfig::default(), &mut NoopStats);

        assert!(grid.get(IVec2::new(3, 1)).is_some());
        grid.check_consistency().unwrap();
    }

    #[test]
    fn test_wall_reflects_with_restitution() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(3, 1);
        let start = IVec2::new(2, 0);
        grid.set(start, moving(start, MaterialId::SAND, Vec2::new(1.0, 0.0)))
            .unwrap();

        let config = PhysicsConfig {
            particle_damping: 1.0,
            ..Default::default()
        };
        KineticsSystem::integrate(&mut grid, &materials, &config, &ThermalConfig::default(), &mut NoopStats);

        let particle = grid.get(start).unwrap();
        let velocity = particle.kinetics.unwrap().velocity;
        assert!((velocity.x + 0.6).abs() < 1e-6);
        assert!(particle.temperature > 20.0);
    }

    #[test]
    fn test_head_on_collision_heats_both() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(4, 1);
        let a = IVec2::new(1, 0);
        let b = IVec2::new(2, 0);
        grid.set(a, moving(a, MaterialId::SAND, Vec2::new(1.5, 0.0))).unwrap();
        grid.set(b, moving(b, MaterialId::SAND, Vec2::new(-1.5, 0.0))).unwrap();

        let config = PhysicsConfig {
            particle_damping: 1.0,
            ..Default::default()
        };
        let mut stats = TickCounters::default();
        KineticsSystem::integrate(&mut grid, &materials, &config, &ThermalConfig::default(), &mut stats);

        assert!(stats.collisions >= 1);
        assert!(grid.get(a).unwrap().temperature > 20.0);
        assert!(grid.get(b).unwrap().temperature > 20.0);
        grid.check_consistency().unwrap();
    }

    #[test]
    fn test_attach_skips_solids() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(2, 1);
        grid.set(IVec2::new(0, 0), Particle::new(IVec2::new(0, 0), MaterialId::STONE, 20.0))
            .unwrap();
        grid.set(IVec2::new(1, 0), Particle::new(IVec2::new(1, 0), MaterialId::WATER, 20.0))
            .unwrap();

        KineticsSystem::attach(&mut grid, &materials);
        assert!(grid.get(IVec2::new(0, 0)).unwrap().kinetics.is_none());
        assert!(grid.get(IVec2::new(1, 0)).unwrap().kinetics.is_some());

        KineticsSystem::detach(&mut grid);
        assert!(grid.iter().all(|p| p.kinetics.is_none()));
    }

    #[test]
    fn test_coupling_drags_particle_with_air() {
        let materials = Materials::builtin();
        let mut grid = Grid::new(8, 8);
        let pos = IVec2::new(1, 1);
        grid.set(pos, moving(pos, MaterialId::SMOKE, Vec2::ZERO)).unwrap();

        let mut field = FieldGrid::new(8, 8, 4);
        field.add_velocity(pos, Vec2::new(2.0, 0.0));
        KineticsSystem::couple(&mut grid, &mut field, &materials, &PhysicsConfig::default());

        let velocity = grid.get(pos).unwrap().kinetics.unwrap().velocity;
        assert!(velocity.x > 0.0);
        assert!(field.sample_velocity(pos).x < 2.0);
    }
}
