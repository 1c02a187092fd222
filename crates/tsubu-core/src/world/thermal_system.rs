//! Heat conduction, radiative loss and temperature-driven phase changes
//!
//! Conduction is a Jacobi update: every orthogonal pair is visited once
//! (east and north links), the exchange is computed from the temperatures
//! at the start of the pass and both sides are updated afterwards. For a
//! pair the energy `E` leaving the hotter particle is
//!
//! ```text
//! k   = 2·ka·kb / (ka + kb)              harmonic mean conductivity
//! E   = min(k·rate, 0.25 / (1/Ca + 1/Cb)) · (Ta − Tb)
//! ΔTa = −E / Ca,  ΔTb = +E / Cb
//! ```
//!
//! so `Σ T·C` is unchanged by conduction. The cap keeps any single link from
//! overshooting equilibrium even with four neighbors.

use glam::IVec2;

use super::transform::{HookEvent, TransformSystem};
use super::{Grid, SimStats};
use crate::config::ThermalConfig;
use crate::error::{SimError, SimResult};
use crate::simulation::{Materials, particle_flags};

const KELVIN_OFFSET: f32 = 273.15;

/// Links checked from each cell; the opposite links come from the neighbor
const LINKS: [IVec2; 2] = [IVec2::new(1, 0), IVec2::new(0, 1)];

/// Thermal pass with a reusable per-cell scratch buffer
#[derive(Debug, Default)]
pub struct ThermalSystem {
    deltas: Vec<f32>,
}

impl ThermalSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conduct, radiate, then apply phase transitions
    pub fn update(
        &mut self,
        grid: &mut Grid,
        materials: &Materials,
        config: &ThermalConfig,
        ambient: f32,
        stats: &mut dyn SimStats,
        hooks: &mut Vec<HookEvent>,
    ) {
        self.conduct(grid, materials, config);
        Self::radiate(grid, materials, config, ambient);
        for pos in grid.occupied_positions() {
            Self::check_transition(grid, materials, pos, stats, hooks);
        }
    }

    /// Exchange heat across every link touching at least one settled particle
    pub fn conduct(&mut self, grid: &mut Grid, materials: &Materials, config: &ThermalConfig) {
        self.deltas.clear();
        self.deltas.resize(grid.len(), 0.0);

        for a in grid.iter() {
            let Some(ia) = grid.index(a.position) else {
                continue;
            };
            let def_a = materials.get(a.material);
            let ca = config.heat_capacity_of(def_a);
            let ka = config.conductivity_of(def_a);

            for link in LINKS {
                let pos_b = a.position + link;
                let Some(b) = grid.get(pos_b) else {
                    continue;
                };
                if a.has_flag(particle_flags::MOVED) && b.has_flag(particle_flags::MOVED) {
                    continue;
                }
                let Some(ib) = grid.index(pos_b) else {
                    continue;
                };
                let def_b = materials.get(b.material);
                let cb = config.heat_capacity_of(def_b);
                let kb = config.conductivity_of(def_b);

                let energy = exchange_energy(a.temperature, ca, ka, b.temperature, cb, kb, config.rate);
                self.deltas[ia] -= energy / ca;
                self.deltas[ib] += energy / cb;
            }
        }

        for (index, delta) in self.deltas.iter().enumerate() {
            if *delta == 0.0 {
                continue;
            }
            if let Some(particle) = grid.get_mut(grid.position(index)) {
                particle.temperature = (particle.temperature + delta)
                    .clamp(config.min_temperature, config.max_temperature);
            }
        }
    }

    /// T⁴ loss for particles above their material's radiative threshold
    ///
    /// Never cools a particle below ambient.
    pub fn radiate(grid: &mut Grid, materials: &Materials, config: &ThermalConfig, ambient: f32) {
        let ambient_k4 = (ambient + KELVIN_OFFSET).max(0.0).powi(4);
        for particle in grid.iter_mut() {
            let def = materials.get(particle.material);
            let Some(threshold) = def.radiative_threshold else {
                continue;
            };
            if particle.temperature <= threshold || def.emissivity <= 0.0 {
                continue;
            }
            let t_k4 = (particle.temperature + KELVIN_OFFSET).max(0.0).powi(4);
            let loss = config.radiation_constant * def.emissivity * (t_k4 - ambient_k4)
                / config.heat_capacity_of(def);
            if loss.is_finite() && loss > 0.0 {
                particle.temperature = (particle.temperature - loss).max(ambient.min(particle.temperature));
            }
        }
    }

    /// Apply the particle's heat or cool transition if its temperature has
    /// crossed the threshold
    ///
    /// A remembering heat transition stores the old material as origin; a
    /// cool transition restores a registered origin instead of its default
    /// target. Returns true when the material changed.
    pub fn check_transition(
        grid: &mut Grid,
        materials: &Materials,
        pos: IVec2,
        stats: &mut dyn SimStats,
        hooks: &mut Vec<HookEvent>,
    ) -> bool {
        let Some(particle) = grid.get(pos) else {
            return false;
        };
        let def = materials.get(particle.material);
        let temperature = particle.temperature;

        if let Some(heat) = def.heat_transition
            && temperature > heat.temperature
        {
            let from = def.id;
            TransformSystem::transform(grid, materials, pos, heat.becomes, hooks);
            if heat.remember_origin
                && let Some(particle) = grid.get_mut(pos)
            {
                particle.origin = Some(from);
            }
            stats.record_state_change();
            return true;
        }

        if let Some(cool) = def.cool_transition
            && temperature < cool.temperature
        {
            let target = particle
                .origin
                .filter(|origin| materials.contains(*origin))
                .unwrap_or(cool.becomes);
            TransformSystem::transform(grid, materials, pos, target, hooks);
            if let Some(particle) = grid.get_mut(pos) {
                particle.origin = None;
            }
            stats.record_state_change();
            return true;
        }

        false
    }

    /// Externally driven temperature change, clamped and followed by a
    /// transition check
    #[allow(clippy::too_many_arguments)]
    pub fn apply_heat(
        grid: &mut Grid,
        materials: &Materials,
        config: &ThermalConfig,
        pos: IVec2,
        delta: f32,
        stats: &mut dyn SimStats,
        hooks: &mut Vec<HookEvent>,
    ) -> SimResult<()> {
        if !grid.in_bounds(pos) {
            return Err(SimError::OutOfBounds { x: pos.x, y: pos.y });
        }
        if !delta.is_finite() {
            return Err(SimError::NotFinite { x: pos.x, y: pos.y });
        }
        let Some(particle) = grid.get_mut(pos) else {
            return Err(SimError::EmptySlot { x: pos.x, y: pos.y });
        };
        particle.temperature =
            (particle.temperature + delta).clamp(config.min_temperature, config.max_temperature);
        Self::check_transition(grid, materials, pos, stats, hooks);
        Ok(())
    }
}

/// Energy flowing from `a` to `b` in one tick (negative when `b` is hotter)
pub fn exchange_energy(ta: f32, ca: f32, ka: f32, tb: f32, cb: f32, kb: f32, rate: f32) -> f32 {
    let k_sum = ka + kb;
    let k_eff = if k_sum > 0.0 { 2.0 * ka * kb / k_sum } else { 0.0 };
    let coefficient = (k_eff * rate).min(0.25 / (1.0 / ca + 1.0 / cb));
    let energy = coefficient * (ta - tb);
    if energy.is_finite() { energy } else { 0.0 }
}
