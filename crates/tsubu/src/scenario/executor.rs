//! Scenario execution engine

use anyhow::{Context, Result, bail};
use glam::IVec2;
use std::time::Instant;
use tsubu_core::simulation::MaterialId;
use tsubu_core::{GridState, TickCounters, World};

use super::actions::ScenarioAction;
use super::definition::ScenarioDefinition;
use super::results::ExecutionReport;
use super::verification::VerificationCondition;

/// Configuration for scenario executor
#[derive(Debug, Clone, Default)]
pub struct ScenarioExecutorConfig {
    /// Extra ticks to run after the main actions, before verification
    pub extra_ticks: u64,

    /// Verbose logging
    pub verbose: bool,
}

/// Executes scenario actions against a world
pub struct ScenarioExecutor {
    /// Configuration
    config: ScenarioExecutorConfig,

    /// Event counters over every tick run so far
    counters: TickCounters,

    /// Action execution log
    log: Vec<String>,

    /// Tick timings (milliseconds)
    tick_times: Vec<f64>,
}

impl ScenarioExecutor {
    /// Create new executor with default config
    pub fn new() -> Self {
        Self::with_config(ScenarioExecutorConfig::default())
    }

    /// Create new executor with custom config
    pub fn with_config(config: ScenarioExecutorConfig) -> Self {
        Self {
            config,
            counters: TickCounters::default(),
            log: Vec::new(),
            tick_times: Vec::new(),
        }
    }

    /// Execute a complete scenario
    pub fn execute_scenario(
        &mut self,
        scenario: &ScenarioDefinition,
        world: &mut World,
    ) -> Result<ExecutionReport> {
        let start_time = Instant::now();
        let mut report = ExecutionReport::new(scenario.name.clone());

        self.log.clear();
        self.counters.reset();
        self.tick_times.clear();

        self.log(&format!("Starting scenario: {}", scenario.name));
        if !scenario.description.is_empty() {
            self.log(&format!("Description: {}", scenario.description));
        }

        // Execute setup actions
        let setup_start = Instant::now();
        if !scenario.setup.is_empty() {
            self.log(&format!("Running {} setup actions", scenario.setup.len()));
            for (idx, action) in scenario.setup.iter().enumerate() {
                if let Err(e) = self.execute_action(action, world) {
                    let msg = format!("Setup action {} failed: {:#}", idx, e);
                    self.log(&msg);
                    return Err(anyhow::anyhow!(msg));
                }
            }
        }
        report.performance.setup_duration_ms = setup_start.elapsed().as_secs_f64() * 1000.0;

        // Execute main actions
        let action_start = Instant::now();
        self.log(&format!("Running {} main actions", scenario.actions.len()));
        for (idx, action) in scenario.actions.iter().enumerate() {
            if let Err(e) = self.execute_action(action, world) {
                let msg = format!("Action {} failed: {:#}", idx, e);
                self.log(&msg);
                return Err(anyhow::anyhow!(msg));
            }
        }
        if self.config.extra_ticks > 0 {
            self.log(&format!("Running {} extra ticks", self.config.extra_ticks));
            self.simulate_ticks(world, self.config.extra_ticks);
        }
        report.performance.action_duration_ms = action_start.elapsed().as_secs_f64() * 1000.0;

        report.actions_executed = scenario.setup.len() + scenario.actions.len();

        // Run verifications
        let verify_start = Instant::now();
        if !scenario.verify.is_empty() {
            self.log(&format!("Running {} verifications", scenario.verify.len()));
            for condition in &scenario.verify {
                let result = condition.evaluate(world);
                self.log(&format!(
                    "  {} {}",
                    if result.passed { "✓" } else { "✗" },
                    result.message
                ));

                if !result.passed {
                    report.verification_failures.push(result);
                }
            }
        }
        report.performance.verification_duration_ms = verify_start.elapsed().as_secs_f64() * 1000.0;

        // Finalize report
        report.ticks_executed = self.tick_times.len() as u64;
        report.counters = self.counters;
        report.passed = report.verification_failures.is_empty();

        // Calculate performance metrics
        report.performance.total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        report.performance.tick_count = report.ticks_executed;
        if !self.tick_times.is_empty() {
            let total_tick_time: f64 = self.tick_times.iter().sum();
            report.performance.avg_tick_time_ms = total_tick_time / self.tick_times.len() as f64;
            report.performance.peak_tick_time_ms =
                self.tick_times.iter().copied().fold(0.0, f64::max);
        }

        self.log(&format!(
            "Scenario complete: {} ({} ticks, {:.1}ms)",
            if report.passed { "PASSED" } else { "FAILED" },
            report.ticks_executed,
            report.performance.total_duration_ms
        ));
        self.log(&format!("  Performance: {}", report.performance.summary()));

        report.log = self.log.clone();
        Ok(report)
    }

    /// Execute a single action
    fn execute_action(&mut self, action: &ScenarioAction, world: &mut World) -> Result<()> {
        if self.config.verbose {
            self.log(&format!("  {:?}", action));
        }

        match action {
            ScenarioAction::Place {
                x,
                y,
                material,
                temperature,
            } => {
                let id = resolve(world, material)?;
                world.place(*x, *y, id, *temperature)?;
            }

            ScenarioAction::Fill {
                min_x,
                min_y,
                max_x,
                max_y,
                material,
                temperature,
            } => {
                let id = resolve(world, material)?;
                let placed = world.fill_rect(
                    IVec2::new(*min_x, *min_y),
                    IVec2::new(*max_x, *max_y),
                    id,
                    *temperature,
                );
                log::debug!("Filled {} cells with {}", placed, material);
            }

            ScenarioAction::Remove { x, y } => {
                world.remove(*x, *y)?;
            }

            ScenarioAction::SetMaterial { x, y, material } => {
                let id = resolve(world, material)?;
                world.set_material_override(*x, *y, id)?;
            }

            ScenarioAction::Heat { x, y, delta } => {
                world.apply_heat(*x, *y, *delta)?;
            }

            ScenarioAction::Charge { x, y } => {
                if !world.charge(*x, *y)? {
                    bail!("Particle at ({}, {}) cannot take a charge", x, y);
                }
            }

            ScenarioAction::ToggleSwitch { x, y } => match world.toggle_switch(*x, *y)? {
                Some(closed) => {
                    self.log(&format!(
                        "  Switch at ({}, {}) {}",
                        x,
                        y,
                        if closed { "closed" } else { "opened" }
                    ));
                }
                None => bail!("Particle at ({}, {}) is not a switch", x, y),
            },

            ScenarioAction::Explode {
                x,
                y,
                radius,
                strength,
            } => {
                world.explode(*x, *y, *radius, *strength)?;
            }

            ScenarioAction::SetAdvancedPhysics { enabled } => {
                world.set_advanced_physics(*enabled);
            }

            ScenarioAction::WaitTicks { ticks } => {
                self.simulate_ticks(world, *ticks);
            }

            ScenarioAction::WaitUntil {
                condition,
                timeout_ticks,
            } => {
                self.wait_until(world, condition, *timeout_ticks)?;
            }

            ScenarioAction::SaveSnapshot { path } => {
                let bytes = world.snapshot().to_bytes()?;
                std::fs::write(path, bytes)
                    .with_context(|| format!("Failed to write snapshot: {}", path))?;
                self.log(&format!("  Snapshot saved: {}", path));
            }

            ScenarioAction::LoadSnapshot { path } => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read snapshot: {}", path))?;
                let state = GridState::from_bytes(&bytes)?;
                *world =
                    World::from_snapshot(&state, world.materials().clone(), world.config().clone())?;
                self.log(&format!("  Snapshot loaded: {} (tick {})", path, state.tick));
            }

            ScenarioAction::Log { message } => {
                self.log(message);
            }
        }

        Ok(())
    }

    /// Step until the condition holds
    fn wait_until(
        &mut self,
        world: &mut World,
        condition: &VerificationCondition,
        timeout_ticks: u64,
    ) -> Result<()> {
        for waited in 0..=timeout_ticks {
            if condition.evaluate(world).passed {
                self.log(&format!("  Condition met after {} ticks", waited));
                return Ok(());
            }
            if waited < timeout_ticks {
                self.simulate_ticks(world, 1);
            }
        }

        let result = condition.evaluate(world);
        bail!(
            "WaitUntil timed out after {} ticks: {}",
            timeout_ticks,
            result.message
        );
    }

    /// Simulate N ticks
    fn simulate_ticks(&mut self, world: &mut World, ticks: u64) {
        #[cfg(feature = "detailed_profiling")]
        let _span = tracing::info_span!("simulate_ticks", ticks).entered();

        for _ in 0..ticks {
            let tick_start = Instant::now();
            world.step(&mut self.counters);
            self.tick_times
                .push(tick_start.elapsed().as_secs_f64() * 1000.0);
        }
    }

    fn log(&mut self, message: &str) {
        log::info!("{}", message);
        self.log.push(message.to_string());
    }
}

impl Default for ScenarioExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(world: &World, name: &str) -> Result<MaterialId> {
    world
        .materials()
        .id_of(name)
        .with_context(|| format!("Unknown material `{}`", name))
}
