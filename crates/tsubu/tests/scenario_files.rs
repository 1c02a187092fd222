//! Runs every bundled scenario file and expects it to pass

use std::path::{Path, PathBuf};

use tsubu::scenario::{ScenarioDefinition, ScenarioExecutor};
use tsubu_core::simulation::Materials;
use tsubu_core::{SimConfig, World};

fn scenario_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

fn run(name: &str) {
    let path = scenario_dir().join(format!("{name}.ron"));
    let scenario = ScenarioDefinition::from_file(&path).unwrap();
    let config = scenario.world.apply(&SimConfig::default());
    let mut world = World::new(Materials::builtin(), config).unwrap();

    let report = ScenarioExecutor::new()
        .execute_scenario(&scenario, &mut world)
        .unwrap();

    assert!(
        report.passed,
        "scenario {name} failed:\n{}",
        report
            .verification_failures
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    );
}

// ============================================================================
// Bundled scenarios
// ============================================================================

#[test]
fn test_sand_fall() {
    run("sand_fall");
}

#[test]
fn test_layering() {
    run("layering");
}

#[test]
fn test_circuit() {
    run("circuit");
}

#[test]
fn test_melt_refreeze() {
    run("melt_refreeze");
}

#[test]
fn test_blast_wave() {
    run("blast_wave");
}

#[test]
fn test_every_file_parses() {
    let mut count = 0;
    for entry in std::fs::read_dir(scenario_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            ScenarioDefinition::from_file(&path).unwrap();
            count += 1;
        }
    }
    assert!(count >= 5);
}

// ============================================================================
// Materials from file
// ============================================================================

#[test]
fn test_custom_registry_drives_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("materials.ron");
    std::fs::write(
        &path,
        r#"MaterialFile(
    materials: [
        (name: "grit", behavior: Powder, density: 2.0),
    ],
)"#,
    )
    .unwrap();

    let materials = tsubu::load_materials(Some(&path)).unwrap();
    let scenario = ScenarioDefinition::from_ron_str(
        r#"(
            name: "grit",
            world: (width: 4, height: 8),
            setup: [Place(x: 1, y: 7, material: "grit")],
            actions: [WaitTicks(ticks: 10)],
            verify: [MaterialAt(x: 1, y: 0, expected: Some("grit"))],
        )"#,
    )
    .unwrap();
    let config = scenario.world.apply(&SimConfig::default());
    let mut world = World::new(materials, config).unwrap();

    let report = ScenarioExecutor::new()
        .execute_scenario(&scenario, &mut world)
        .unwrap();
    assert!(report.passed);
}

#[test]
fn test_missing_registry_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(tsubu::load_materials(Some(&dir.path().join("absent.ron"))).is_err());
}
