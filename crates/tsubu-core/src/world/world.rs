//! World - owns the grid and runs the tick scheduler

use glam::IVec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use super::ca_update::CellularAutomataUpdater;
use super::chemistry_system::ChemistrySystem;
use super::electrical_system::ElectricalSystem;
use super::snapshot::GridState;
use super::thermal_system::ThermalSystem;
use super::transform::{HookEvent, TransformSystem};
use super::{Grid, NoopStats, SimStats};
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::physics::{FieldGrid, PhysicsSystem};
use crate::simulation::{ChargeGate, Kinetics, MaterialId, Materials, Particle};

/// The simulated world: particle grid, registry, and per-tick state
pub struct World {
    grid: Grid,

    /// Material definitions, replaced only between ticks
    materials: Materials,

    config: SimConfig,

    /// Single source of randomness for every phase
    rng: Xoshiro256StarStar,

    /// Ticks completed so far
    tick: u64,

    /// Thermal phase (keeps its exchange buffer between ticks)
    thermal: ThermalSystem,

    /// Present exactly while the advanced physics extension is on
    field: Option<FieldGrid>,

    /// Hooks queued by the current phase
    hooks: Vec<HookEvent>,
}

impl World {
    /// Create an empty world
    ///
    /// Fails before any tick can run when the config or registry is invalid.
    pub fn new(materials: Materials, config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        materials.validate()?;

        let mut world = Self {
            grid: Grid::new(config.width, config.height),
            rng: Xoshiro256StarStar::seed_from_u64(config.seed),
            materials,
            tick: 0,
            thermal: ThermalSystem::new(),
            field: None,
            hooks: Vec::new(),
            config,
        };
        if world.config.physics.enabled {
            world.set_advanced_physics(true);
        }

        log::info!(
            "Created {}x{} world with {} materials (seed {})",
            world.config.width,
            world.config.height,
            world.materials.len(),
            world.config.seed
        );
        Ok(world)
    }

    /// Advance the simulation one tick
    pub fn step(&mut self, stats: &mut dyn SimStats) {
        #[cfg(feature = "detailed_profiling")]
        let _tick_span = tracing::info_span!("tick", tick = self.tick).entered();

        // 1. Clear per-tick flags
        self.grid.clear_tick_flags();

        // 2. Behavior (movement)
        {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("behavior").entered();
            CellularAutomataUpdater::update(
                &mut self.grid,
                &self.materials,
                &self.config.behavior,
                self.tick,
                stats,
                &mut self.rng,
            );
        }

        // 3. Heat exchange and phase transitions
        {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("thermal").entered();
            self.thermal.update(
                &mut self.grid,
                &self.materials,
                &self.config.thermal,
                self.config.ambient_temperature,
                stats,
                &mut self.hooks,
            );
            self.apply_hooks();
        }

        // 4. Lifetimes, fire, and neighbor reactions
        {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("reaction").entered();
            ChemistrySystem::update(
                &mut self.grid,
                &self.materials,
                &self.config,
                self.tick,
                stats,
                &mut self.rng,
                &mut self.hooks,
            );
            self.apply_hooks();
        }

        // 5. Charge propagation
        {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("electrical").entered();
            ElectricalSystem::update(
                &mut self.grid,
                &self.materials,
                &self.config.electrical,
                &self.config.thermal,
                stats,
            );
        }

        // 6. Advanced physics (only while enabled)
        if let Some(field) = self.field.as_mut() {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("physics").entered();
            PhysicsSystem::step(&mut self.grid, field, &self.materials, &self.config, stats);
        }

        self.tick += 1;

        if (cfg!(debug_assertions) || self.config.check_consistency)
            && let Err(e) = self.grid.check_consistency()
        {
            log::error!("Grid invariant broken after tick {}: {e}", self.tick);
        }
    }

    /// Advance several ticks
    pub fn step_n(&mut self, ticks: u64, stats: &mut dyn SimStats) {
        for _ in 0..ticks {
            self.step(stats);
        }
    }

    fn apply_hooks(&mut self) {
        if self.hooks.is_empty() {
            return;
        }
        TransformSystem::apply_hooks(
            &mut self.grid,
            self.field.as_mut(),
            &self.materials,
            &self.config,
            &mut self.hooks,
        );
    }

    /// Map ids missing from the registry to the fallback material
    fn resolve_material(&self, material: MaterialId) -> MaterialId {
        if self.materials.contains(material) {
            material
        } else {
            log::warn!("Unknown material {material}, substituting fallback");
            MaterialId::UNKNOWN
        }
    }

    fn checked_pos(&self, x: i32, y: i32) -> SimResult<IVec2> {
        let pos = IVec2::new(x, y);
        if self.grid.in_bounds(pos) {
            Ok(pos)
        } else {
            Err(SimError::OutOfBounds { x, y })
        }
    }

    fn occupied_pos(&self, x: i32, y: i32) -> SimResult<IVec2> {
        let pos = self.checked_pos(x, y)?;
        if self.grid.get(pos).is_none() {
            return Err(SimError::EmptySlot { x, y });
        }
        Ok(pos)
    }

    /// Create a particle in an empty cell
    ///
    /// Without an explicit temperature the material's default (or ambient)
    /// is used.
    pub fn place(
        &mut self,
        x: i32,
        y: i32,
        material: MaterialId,
        initial_temp: Option<f32>,
    ) -> SimResult<()> {
        let pos = self.checked_pos(x, y)?;
        if self.grid.get(pos).is_some() {
            return Err(SimError::SlotOccupied { x, y });
        }
        if initial_temp.is_some_and(|t| !t.is_finite()) {
            return Err(SimError::NotFinite { x, y });
        }

        let def = self.materials.get(self.resolve_material(material));
        let thermal = &self.config.thermal;
        let temperature = initial_temp
            .or(def.default_temperature)
            .unwrap_or(self.config.ambient_temperature)
            .clamp(thermal.min_temperature, thermal.max_temperature);

        let mut particle = Particle::spawn(pos, def, temperature);
        if self.field.is_some() && !def.behavior.is_solid() {
            particle.kinetics = Some(Kinetics::default());
        }
        self.grid.insert(pos, particle)
    }

    /// Fill a rectangle (inclusive corners, clipped to the grid) with a
    /// material, skipping occupied cells
    ///
    /// Returns the number of particles placed.
    pub fn fill_rect(
        &mut self,
        from: IVec2,
        to: IVec2,
        material: MaterialId,
        initial_temp: Option<f32>,
    ) -> usize {
        let min = from.min(to).max(IVec2::ZERO);
        let max = from
            .max(to)
            .min(IVec2::new(self.grid.width() - 1, self.grid.height() - 1));
        let mut placed = 0;
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                if self.place(x, y, material, initial_temp).is_ok() {
                    placed += 1;
                }
            }
        }
        placed
    }

    /// Delete a particle
    pub fn remove(&mut self, x: i32, y: i32) -> SimResult<Particle> {
        let pos = self.checked_pos(x, y)?;
        self.grid.clear(pos).ok_or(SimError::EmptySlot { x, y })
    }

    /// Tool-driven temperature change, clamped and followed by a transition
    /// check
    pub fn apply_heat(&mut self, x: i32, y: i32, delta: f32) -> SimResult<()> {
        ThermalSystem::apply_heat(
            &mut self.grid,
            &self.materials,
            &self.config.thermal,
            IVec2::new(x, y),
            delta,
            &mut NoopStats,
            &mut self.hooks,
        )?;
        self.apply_hooks();
        Ok(())
    }

    /// Forced type change, bypassing reaction gates but running the new
    /// material's transform hook
    pub fn set_material_override(&mut self, x: i32, y: i32, material: MaterialId) -> SimResult<()> {
        let pos = self.occupied_pos(x, y)?;
        let material = self.resolve_material(material);
        TransformSystem::transform(&mut self.grid, &self.materials, pos, material, &mut self.hooks);

        let wants_kinetics =
            self.field.is_some() && !self.materials.get(material).behavior.is_solid();
        if let Some(particle) = self.grid.get_mut(pos) {
            particle.origin = None;
            if wants_kinetics && particle.kinetics.is_none() {
                particle.kinetics = Some(Kinetics::default());
            }
        }
        self.apply_hooks();
        Ok(())
    }

    /// Put a charge marker on a conductive particle
    ///
    /// Returns false when the particle cannot take a charge.
    pub fn charge(&mut self, x: i32, y: i32) -> SimResult<bool> {
        let pos = self.occupied_pos(x, y)?;
        Ok(ElectricalSystem::try_charge(
            &mut self.grid,
            &self.materials,
            &self.config.electrical,
            pos,
            &mut NoopStats,
        ))
    }

    /// Flip a switch; opening it drops any charge it holds
    ///
    /// Returns the new closed state, or `None` when the particle is not a
    /// switch.
    pub fn toggle_switch(&mut self, x: i32, y: i32) -> SimResult<Option<bool>> {
        let pos = self.occupied_pos(x, y)?;
        let Some(particle) = self.grid.get_mut(pos) else {
            return Err(SimError::EmptySlot { x, y });
        };
        if self.materials.get(particle.material).gate != ChargeGate::Switch {
            return Ok(None);
        }
        let closed = !particle.is_switch_closed();
        particle.set_switch_closed(closed);
        if !closed {
            particle.electric.charge = 0;
        }
        Ok(Some(closed))
    }

    /// Heat the area around a point and, with advanced physics on, inject a
    /// pressure impulse
    pub fn explode(&mut self, x: i32, y: i32, radius: f32, strength: f32) -> SimResult<()> {
        let pos = self.checked_pos(x, y)?;
        if !radius.is_finite() || !strength.is_finite() {
            return Err(SimError::NotFinite { x, y });
        }
        TransformSystem::explode(
            &mut self.grid,
            self.field.as_mut(),
            &self.config,
            pos,
            radius,
            strength,
        );
        Ok(())
    }

    /// Switch the advanced physics extension on or off
    ///
    /// Turning it on creates a zeroed field and zero velocities; turning it
    /// off drops both. Particle materials and temperatures are untouched.
    pub fn set_advanced_physics(&mut self, enabled: bool) {
        match (enabled, self.field.is_some()) {
            (true, false) => {
                self.field = Some(PhysicsSystem::initialize(
                    &mut self.grid,
                    &self.materials,
                    &self.config,
                ));
                log::info!("Advanced physics enabled");
            }
            (false, true) => {
                self.field = None;
                PhysicsSystem::quiesce(&mut self.grid);
                log::info!("Advanced physics disabled");
            }
            _ => {}
        }
    }

    pub fn advanced_physics_enabled(&self) -> bool {
        self.field.is_some()
    }

    /// Export all particle and field state
    pub fn snapshot(&self) -> GridState {
        GridState::capture(&self.grid, self.tick, self.field.as_ref())
    }

    /// Rebuild a world from a snapshot
    ///
    /// Grid dimensions come from the snapshot; the RNG is reseeded from the
    /// config. Particles of materials missing from `materials` become the
    /// fallback.
    pub fn from_snapshot(state: &GridState, materials: Materials, mut config: SimConfig) -> SimResult<Self> {
        config.width = state.width;
        config.height = state.height;
        config.physics.enabled = false;

        let mut world = Self::new(materials, config)?;
        world.grid = state.to_grid()?;
        world.tick = state.tick;
        world.retag_unknown();

        if state.advanced_physics {
            let (width, height) = (world.grid.width(), world.grid.height());
            let cell_size = world.config.physics.field_cell_size;
            let field = match state.field.clone() {
                Some(field) if field.covers(width, height, cell_size) => field,
                Some(_) => {
                    log::warn!("Snapshot field does not match the grid, starting from a calm field");
                    FieldGrid::new(width, height, cell_size)
                }
                None => FieldGrid::new(width, height, cell_size),
            };
            world.field = Some(field);
            crate::physics::KineticsSystem::attach(&mut world.grid, &world.materials);
        } else {
            PhysicsSystem::quiesce(&mut world.grid);
        }

        log::info!(
            "Restored world at tick {} with {} particles",
            world.tick,
            world.grid.particle_count()
        );
        Ok(world)
    }

    /// Swap in a new registry between ticks
    pub fn replace_materials(&mut self, materials: Materials) -> SimResult<()> {
        materials.validate()?;
        self.materials = materials;
        self.retag_unknown();
        if self.field.is_some() {
            for particle in self.grid.iter_mut() {
                if self.materials.get(particle.material).behavior.is_solid() {
                    particle.kinetics = None;
                }
            }
            crate::physics::KineticsSystem::attach(&mut self.grid, &self.materials);
        }
        log::info!("Material registry replaced ({} materials)", self.materials.len());
        Ok(())
    }

    fn retag_unknown(&mut self) {
        let mut retagged = 0usize;
        for particle in self.grid.iter_mut() {
            if !self.materials.contains(particle.material) {
                particle.material = MaterialId::UNKNOWN;
                particle.origin = None;
                retagged += 1;
            } else if particle
                .origin
                .is_some_and(|origin| !self.materials.contains(origin))
            {
                particle.origin = None;
            }
        }
        if retagged > 0 {
            log::warn!("{retagged} particles had unknown materials and now use the fallback");
        }
    }

    /// Verify the grid/particle position invariant
    pub fn check_consistency(&self) -> SimResult<()> {
        self.grid.check_consistency()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn materials(&self) -> &Materials {
        &self.materials
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn field(&self) -> Option<&FieldGrid> {
        self.field.as_ref()
    }

    pub fn width(&self) -> i32 {
        self.grid.width()
    }

    pub fn height(&self) -> i32 {
        self.grid.height()
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Particle> {
        self.grid.get(IVec2::new(x, y))
    }

    pub fn material_at(&self, x: i32, y: i32) -> Option<MaterialId> {
        self.get(x, y).map(|p| p.material)
    }

    pub fn temperature_at(&self, x: i32, y: i32) -> Option<f32> {
        self.get(x, y).map(|p| p.temperature)
    }

    pub fn count_material(&self, material: MaterialId) -> usize {
        self.grid.iter().filter(|p| p.material == material).count()
    }

    pub fn particle_count(&self) -> usize {
        self.grid.particle_count()
    }
}
