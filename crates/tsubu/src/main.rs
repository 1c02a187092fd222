use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tsubu::config::HostConfig;
use tsubu::scenario::{ScenarioDefinition, ScenarioExecutor, ScenarioExecutorConfig};
use tsubu_core::World;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (default: tsubu.ron in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a RON scenario and verify its outcome
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Material registry file (default: built-in materials)
        #[arg(long)]
        materials: Option<PathBuf>,

        /// Extra ticks to simulate after the scenario's actions
        #[arg(long, default_value = "0")]
        ticks: u64,

        /// Start with the advanced physics extension enabled
        #[arg(long)]
        advanced: bool,

        /// Write a JSON execution report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List the materials of a registry
    Materials {
        /// Material registry file (default: built-in materials)
        #[arg(long)]
        materials: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "detailed_profiling")]
    let _trace_guard = init_tracing();

    let args = Args::parse();
    let host = match &args.config {
        Some(path) => HostConfig::load_from(path)?,
        None => HostConfig::load()?,
    };

    match args.command {
        Command::Run {
            scenario,
            materials,
            ticks,
            advanced,
            report,
        } => run_scenario(&host, &scenario, materials, ticks, advanced, report),
        Command::Materials { materials } => {
            let path = materials.or_else(|| host.runner.materials.clone());
            list_materials(path)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_scenario(
    host: &HostConfig,
    scenario_path: &PathBuf,
    materials: Option<PathBuf>,
    ticks: u64,
    advanced: bool,
    report_path: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let scenario = ScenarioDefinition::from_file(scenario_path)?;
    let materials_path = materials.or_else(|| host.runner.materials.clone());
    let materials = tsubu::load_materials(materials_path.as_deref())?;

    let mut config = scenario.world.apply(&host.simulation);
    config.physics.enabled |= advanced;
    let mut world = World::new(materials, config).context("Failed to create world")?;

    log::info!("Running scenario: {}", scenario.name);
    let mut executor = ScenarioExecutor::with_config(ScenarioExecutorConfig {
        extra_ticks: ticks,
        verbose: host.runner.verbose,
    });
    let report = executor.execute_scenario(&scenario, &mut world)?;

    let report_path = report_path.or_else(|| {
        host.runner
            .report_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", scenario.name.replace(' ', "_"))))
    });
    if let Some(path) = report_path {
        report.save_json(&path)?;
        log::info!("Report saved: {}", path.display());
    }

    println!(
        "{}: {} ({} ticks, {} reactions, {} state changes)",
        report.scenario_name,
        if report.passed { "PASSED" } else { "FAILED" },
        report.ticks_executed,
        report.counters.reactions,
        report.counters.state_changes
    );
    for failure in &report.verification_failures {
        println!("  ✗ {}", failure.message);
    }

    Ok(if report.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_materials(path: Option<PathBuf>) -> anyhow::Result<()> {
    let materials = tsubu::load_materials(path.as_deref())?;

    println!("{:>4}  {:<12} {:<10} {:>8}", "id", "name", "behavior", "density");
    for def in materials.iter() {
        let behavior = match def.behavior {
            tsubu_core::simulation::BehaviorCategory::Custom(custom) => custom.name().to_string(),
            other => format!("{:?}", other),
        };
        println!(
            "{:>4}  {:<12} {:<10} {:>8.4}",
            def.id.0, def.name, behavior, def.density
        );
    }
    let reactions = materials.reactions().len();
    println!("{} materials, {} reactions", materials.len(), reactions);
    Ok(())
}

#[cfg(feature = "detailed_profiling")]
fn init_tracing() -> tracing_chrome::FlushGuard {
    use tracing_subscriber::prelude::*;

    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().build();
    tracing_subscriber::registry().with(chrome_layer).init();
    log::info!("Writing chrome trace for this run");
    guard
}
