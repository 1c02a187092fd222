//! Charge propagation through conductive particles
//!
//! Charge advances one cell per tick: only particles that were charged when
//! the phase started (plus permanent sources) hand it on. A particle whose
//! charge has just expired refuses new charge for its material's cooldown,
//! which keeps a pulse from bouncing back along a wire.

use glam::IVec2;

use super::{Grid, ORTHOGONAL, SimStats};
use crate::config::{ElectricalConfig, ThermalConfig};
use crate::simulation::{ChargeGate, MaterialDef, Materials, Particle, particle_flags};

/// Handles the electrical phase of a tick
pub struct ElectricalSystem;

impl ElectricalSystem {
    pub fn update(
        grid: &mut Grid,
        materials: &Materials,
        config: &ElectricalConfig,
        thermal: &ThermalConfig,
        stats: &mut dyn SimStats,
    ) {
        let sources: Vec<IVec2> = grid
            .iter()
            .filter(|p| p.electric.is_charged() || materials.get(p.material).emits_charge)
            .map(|p| p.position)
            .collect();

        for source in sources {
            for offset in ORTHOGONAL {
                Self::try_charge(grid, materials, config, source + offset, stats);
            }
        }

        for particle in grid.iter_mut() {
            let def = materials.get(particle.material);
            if particle.electric.is_charged() && def.on_charge_heat != 0.0 {
                particle.temperature = (particle.temperature + def.on_charge_heat)
                    .clamp(thermal.min_temperature, thermal.max_temperature);
            }
            Self::age(particle, def);
        }
    }

    /// Give a fresh charge to the particle at `pos` if it can take one
    ///
    /// Returns true when the particle became charged.
    pub fn try_charge(
        grid: &mut Grid,
        materials: &Materials,
        config: &ElectricalConfig,
        pos: IVec2,
        stats: &mut dyn SimStats,
    ) -> bool {
        let Some(particle) = grid.get_mut(pos) else {
            return false;
        };
        let def = materials.get(particle.material);
        if !Self::can_receive(particle, def) {
            return false;
        }
        particle.electric.charge = def
            .charge_lifetime
            .unwrap_or(config.default_charge_lifetime)
            .max(1);
        particle.set_flag(particle_flags::CHARGED_THIS_TICK);
        stats.record_charge_propagated();
        true
    }

    /// Conductive, not refractory, and not behind an open switch
    pub fn can_receive(particle: &Particle, def: &MaterialDef) -> bool {
        def.conductive
            && particle.electric.accepts_charge()
            && match def.gate {
                ChargeGate::Always => true,
                ChargeGate::Switch => particle.is_switch_closed(),
            }
    }

    /// Count down charge and cooldown
    fn age(particle: &mut Particle, def: &MaterialDef) {
        if particle.has_flag(particle_flags::CHARGED_THIS_TICK) {
            return;
        }
        let electric = &mut particle.electric;
        if electric.charge > 0 {
            electric.charge -= 1;
            if electric.charge == 0 {
                electric.cooldown = def.charge_cooldown;
            }
        } else if electric.cooldown > 0 {
            electric.cooldown -= 1;
        }
    }
}
