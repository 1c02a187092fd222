//! End-to-end scenarios driven through the public World API

use glam::{IVec2, Vec2};
use tsubu_core::simulation::{
    BehaviorCategory, MaterialDef, MaterialId, Materials, Outcome, ReactionRule,
};
use tsubu_core::{NoopStats, SimConfig, TickCounters, World};

fn world(width: u32, height: u32) -> World {
    world_with(Materials::builtin(), width, height)
}

fn world_with(materials: Materials, width: u32, height: u32) -> World {
    let config = SimConfig {
        width,
        height,
        check_consistency: true,
        ..Default::default()
    };
    World::new(materials, config).unwrap()
}

fn solid(id: u16, name: &str, capacity: f32) -> MaterialDef {
    MaterialDef {
        id: MaterialId(id),
        name: name.to_string(),
        behavior: BehaviorCategory::Solid,
        heat_capacity: Some(capacity),
        heat_conductivity: Some(0.5),
        ..Default::default()
    }
}

// ============================================================================
// Behavior
// ============================================================================

#[test]
fn test_powder_reaches_floor_in_exactly_n_ticks() {
    let mut world = world(8, 20);
    world.place(3, 19, MaterialId::SAND, None).unwrap();

    for tick in 1..=19 {
        world.step(&mut NoopStats);
        assert_eq!(
            world.material_at(3, 19 - tick),
            Some(MaterialId::SAND),
            "sand should be at row {} after {tick} ticks",
            19 - tick
        );
        assert_eq!(world.particle_count(), 1);
    }

    // Resting on the floor
    world.step(&mut NoopStats);
    assert_eq!(world.material_at(3, 0), Some(MaterialId::SAND));
}

#[test]
fn test_column_settles_by_density() {
    let mut world = world(1, 12);
    let pour = [
        MaterialId::OIL,
        MaterialId::SAND,
        MaterialId::WATER,
        MaterialId::OIL,
        MaterialId::SAND,
        MaterialId::WATER,
        MaterialId::OIL,
        MaterialId::SAND,
    ];
    for (y, material) in pour.iter().enumerate() {
        world.place(0, y as i32, *material, None).unwrap();
    }

    world.step_n(200, &mut NoopStats);

    let column: Vec<MaterialId> = (0..8).filter_map(|y| world.material_at(0, y)).collect();
    assert_eq!(
        column,
        vec![
            MaterialId::SAND,
            MaterialId::SAND,
            MaterialId::SAND,
            MaterialId::WATER,
            MaterialId::WATER,
            MaterialId::OIL,
            MaterialId::OIL,
            MaterialId::OIL,
        ]
    );
}

#[test]
fn test_steam_rises_above_water() {
    let mut world = world(1, 6);
    world.place(0, 0, MaterialId::STEAM, Some(150.0)).unwrap();

    world.step_n(5, &mut NoopStats);
    assert_eq!(world.material_at(0, 5), Some(MaterialId::STEAM));
}

// ============================================================================
// Thermal
// ============================================================================

#[test]
fn test_equilibrium_favors_high_capacity() {
    let mut materials = Materials::empty();
    materials.register(solid(1, "light", 1.0)).unwrap();
    materials.register(solid(2, "heavy", 4.0)).unwrap();
    let mut world = world_with(materials, 2, 1);
    world.place(0, 0, MaterialId(1), Some(100.0)).unwrap();
    world.place(1, 0, MaterialId(2), Some(0.0)).unwrap();

    world.step_n(300, &mut NoopStats);

    let hot = world.temperature_at(0, 0).unwrap();
    let cold = world.temperature_at(1, 0).unwrap();
    assert!((hot - cold).abs() < 0.01);
    // Capacity-weighted mean is 20, the naive mean would be 50
    assert!((hot - 20.0).abs() < 0.1);
}

#[test]
fn test_melt_and_refreeze_round_trip() {
    let mut world = world(4, 4);
    world.place(1, 1, MaterialId::GLASS, None).unwrap();

    world.apply_heat(1, 1, 1500.0).unwrap();
    let molten = world.get(1, 1).unwrap();
    assert_eq!(molten.material, MaterialId::LAVA);
    assert_eq!(molten.origin, Some(MaterialId::GLASS));

    world.apply_heat(1, 1, -1200.0).unwrap();
    let solid = world.get(1, 1).unwrap();
    assert_eq!(solid.material, MaterialId::GLASS);
    assert_eq!(solid.origin, None);
}

#[test]
fn test_ice_melts_next_to_lava() {
    let mut world = world(3, 1);
    world.place(0, 0, MaterialId::WALL, None).unwrap();
    world.place(1, 0, MaterialId::ICE, None).unwrap();
    world.place(2, 0, MaterialId::WALL, None).unwrap();
    world.apply_heat(1, 0, 30.0).unwrap();

    assert_eq!(world.material_at(1, 0), Some(MaterialId::WATER));
}

// ============================================================================
// Reactions
// ============================================================================

#[test]
fn test_unlucky_rule_never_mutates() {
    let mut materials = Materials::empty();
    materials.register(solid(1, "left", 1.0)).unwrap();
    materials.register(solid(2, "right", 1.0)).unwrap();
    materials.register_reaction(
        MaterialId(1),
        MaterialId(2),
        ReactionRule {
            name: "never".to_string(),
            self_becomes: Outcome::Destroy,
            neighbor_becomes: Outcome::Become(MaterialId(1)),
            probability: 0.0,
            ..Default::default()
        },
    );
    let mut world = world_with(materials, 2, 1);
    world.place(0, 0, MaterialId(1), None).unwrap();
    world.place(1, 0, MaterialId(2), None).unwrap();
    let before = world.snapshot().particles;

    let mut stats = TickCounters::default();
    world.step_n(50, &mut stats);

    assert_eq!(world.snapshot().particles, before);
    assert_eq!(stats.reactions, 0);
}

#[test]
fn test_certain_rule_fires_once_per_tick() {
    let mut materials = Materials::empty();
    materials.register(solid(1, "seed", 1.0)).unwrap();
    materials.register(solid(2, "soil", 1.0)).unwrap();
    materials.register_reaction(
        MaterialId(1),
        MaterialId(2),
        ReactionRule {
            name: "spread".to_string(),
            neighbor_becomes: Outcome::Become(MaterialId(1)),
            ..Default::default()
        },
    );
    let mut world = world_with(materials, 5, 1);
    world.place(0, 0, MaterialId(1), None).unwrap();
    for x in 1..5 {
        world.place(x, 0, MaterialId(2), None).unwrap();
    }

    let mut stats = TickCounters::default();
    world.step(&mut stats);

    // The converted neighbor is spent and cannot pass it on in the same tick
    assert_eq!(stats.reactions, 1);
    assert_eq!(world.count_material(MaterialId(1)), 2);
}

#[test]
fn test_fire_burns_out() {
    let mut world = world(4, 4);
    world.place(1, 1, MaterialId::FIRE, None).unwrap();

    world.step_n(300, &mut NoopStats);

    assert_eq!(world.count_material(MaterialId::FIRE), 0);
    assert_eq!(world.count_material(MaterialId::SMOKE), 0);
}

// ============================================================================
// Electrical
// ============================================================================

#[test]
fn test_charge_crosses_chain_and_extinguishes() {
    let mut world = world(5, 1);
    for x in 0..5 {
        world.place(x, 0, MaterialId::METAL, None).unwrap();
    }
    assert!(world.charge(0, 0).unwrap());

    world.step_n(3, &mut NoopStats);
    assert!(!world.get(4, 0).unwrap().electric.is_charged());
    world.step(&mut NoopStats);
    assert!(world.get(4, 0).unwrap().electric.is_charged());

    world.step_n(20, &mut NoopStats);
    for x in 0..5 {
        assert!(!world.get(x, 0).unwrap().electric.is_charged());
    }
}

#[test]
fn test_open_switch_isolates_circuit() {
    let mut world = world(3, 1);
    world.place(0, 0, MaterialId::BATTERY, None).unwrap();
    world.place(1, 0, MaterialId::SWITCH, None).unwrap();
    world.place(2, 0, MaterialId::HEATER, None).unwrap();

    world.step_n(10, &mut NoopStats);
    assert_eq!(world.temperature_at(2, 0), Some(20.0));

    assert_eq!(world.toggle_switch(1, 0).unwrap(), Some(true));
    world.step_n(10, &mut NoopStats);
    assert!(world.temperature_at(2, 0).unwrap() > 20.0);
}

// ============================================================================
// Advanced physics
// ============================================================================

#[test]
fn test_impulse_spreads_then_decays() {
    let mut world = world(64, 64);
    world.set_advanced_physics(true);
    world.explode(32, 32, 12.0, 10.0).unwrap();

    world.step(&mut NoopStats);
    let field = world.field().unwrap();
    let center = field.cell_of(IVec2::new(32, 32));
    assert!(field.velocity_at(center + IVec2::X).x > 0.0);
    assert!(field.velocity_at(center - IVec2::X).x < 0.0);
    assert!(field.velocity_at(center + IVec2::Y).y > 0.0);
    assert!(field.velocity_at(center - IVec2::Y).y < 0.0);

    world.step_n(150, &mut NoopStats);
    let field = world.field().unwrap();
    assert!(field.max_pressure() < 0.01);
    assert!(field.max_speed() < 0.01);
}

#[test]
fn test_explosion_pushes_light_particles() {
    let mut world = world(32, 32);
    world.set_advanced_physics(true);
    world.place(20, 16, MaterialId::SMOKE, None).unwrap();
    world.explode(16, 16, 10.0, 20.0).unwrap();

    world.step(&mut NoopStats);

    let smoke = world
        .grid()
        .iter()
        .find(|p| p.material == MaterialId::SMOKE)
        .unwrap();
    let velocity = smoke.kinetics.map_or(Vec2::ZERO, |k| k.velocity);
    assert!(velocity.x > 0.0);
}

#[test]
fn test_toggle_keeps_decisions_and_state() {
    let mut world = world(16, 16);
    world.fill_rect(IVec2::new(0, 0), IVec2::new(15, 0), MaterialId::STONE, None);
    world.place(5, 1, MaterialId::WATER, Some(60.0)).unwrap();
    world.step_n(5, &mut NoopStats);
    let before = world.snapshot();

    world.set_advanced_physics(true);
    world.set_advanced_physics(false);
    let after = world.snapshot();

    assert_eq!(after.particles, before.particles);
    assert!(!after.advanced_physics);
}

#[test]
fn test_consistency_holds_in_busy_world() {
    let mut world = world(32, 32);
    world.set_advanced_physics(true);
    world.fill_rect(IVec2::new(0, 0), IVec2::new(31, 1), MaterialId::STONE, None);
    world.fill_rect(IVec2::new(2, 10), IVec2::new(8, 14), MaterialId::SAND, None);
    world.fill_rect(IVec2::new(12, 10), IVec2::new(18, 14), MaterialId::WATER, None);
    world.fill_rect(IVec2::new(20, 2), IVec2::new(24, 4), MaterialId::LAVA, None);
    world.fill_rect(IVec2::new(26, 2), IVec2::new(29, 6), MaterialId::WOOD, None);
    world.place(27, 7, MaterialId::FIRE, None).unwrap();
    world.fill_rect(IVec2::new(10, 20), IVec2::new(12, 22), MaterialId::GUNPOWDER, None);
    world.place(11, 23, MaterialId::FIRE, None).unwrap();

    let mut stats = TickCounters::default();
    for _ in 0..120 {
        world.step(&mut stats);
        world.check_consistency().unwrap();
    }
    assert!(stats.particles_moved > 0);
}
