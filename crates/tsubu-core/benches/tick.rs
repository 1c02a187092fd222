//! Benchmarks for full world ticks.
//!
//! Run with: `cargo bench -p tsubu-core`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::IVec2;
use tsubu_core::simulation::{MaterialId, Materials};
use tsubu_core::{NoopStats, SimConfig, World};

fn mixed_world(size: u32, advanced: bool) -> World {
    let config = SimConfig {
        width: size,
        height: size,
        ..Default::default()
    };
    let Ok(mut world) = World::new(Materials::builtin(), config) else {
        panic!("default config must be valid");
    };
    world.set_advanced_physics(advanced);

    let s = size as i32;
    world.fill_rect(IVec2::new(0, 0), IVec2::new(s - 1, 2), MaterialId::STONE, None);
    world.fill_rect(IVec2::new(2, s / 2), IVec2::new(s / 3, s - 4), MaterialId::SAND, None);
    world.fill_rect(IVec2::new(s / 3 + 2, s / 2), IVec2::new(2 * s / 3, s - 4), MaterialId::WATER, None);
    world.fill_rect(IVec2::new(2 * s / 3 + 2, 3), IVec2::new(s - 3, s / 4), MaterialId::WOOD, None);
    world.fill_rect(IVec2::new(2 * s / 3 + 2, s / 4 + 1), IVec2::new(s - 3, s / 4 + 2), MaterialId::FIRE, None);
    world.fill_rect(IVec2::new(4, 3), IVec2::new(s / 4, 6), MaterialId::METAL, None);
    let _ = world.place(3, 3, MaterialId::BATTERY, None);
    world
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for size in [64u32, 128, 256] {
        group.bench_with_input(BenchmarkId::new("mixed", size), &size, |b, &size| {
            let mut world = mixed_world(size, false);
            b.iter(|| {
                world.step(&mut NoopStats);
                black_box(world.tick())
            })
        });

        group.bench_with_input(BenchmarkId::new("mixed_advanced", size), &size, |b, &size| {
            let mut world = mixed_world(size, true);
            b.iter(|| {
                world.step(&mut NoopStats);
                black_box(world.tick())
            })
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let world = mixed_world(128, true);
    c.bench_function("snapshot_bytes", |b| {
        b.iter(|| black_box(world.snapshot().to_bytes()))
    });
}

criterion_group!(benches, bench_tick, bench_snapshot);
criterion_main!(benches);
