//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::simulation::MaterialDef;

/// Top-level simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// Seed for the world RNG
    pub seed: u64,
    /// Temperature of empty space and fresh particles (Celsius)
    pub ambient_temperature: f32,
    /// Verify the grid invariant after every tick (debug builds always do)
    pub check_consistency: bool,
    pub thermal: ThermalConfig,
    pub behavior: BehaviorConfig,
    pub electrical: ElectricalConfig,
    pub physics: PhysicsConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 192,
            seed: 42,
            ambient_temperature: 20.0,
            check_consistency: false,
            thermal: ThermalConfig::default(),
            behavior: BehaviorConfig::default(),
            electrical: ElectricalConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Fraction of the conductive exchange applied per tick
    pub rate: f32,
    pub default_heat_capacity: f32,
    pub default_conductivity: f32,
    /// Scale of the T⁴ radiative loss (Kelvin based)
    pub radiation_constant: f32,
    /// Absolute zero
    pub min_temperature: f32,
    pub max_temperature: f32,
    /// Degrees added at the center of an explosion per unit strength
    pub explosion_heat_scale: f32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            rate: 0.2,
            default_heat_capacity: tsubu_simulation::DEFAULT_HEAT_CAPACITY,
            default_conductivity: tsubu_simulation::DEFAULT_HEAT_CONDUCTIVITY,
            radiation_constant: 5.0e-13,
            min_temperature: -273.15,
            max_temperature: 10_000.0,
            explosion_heat_scale: 10.0,
        }
    }
}

impl ThermalConfig {
    /// Heat capacity of a material, never zero or NaN
    pub fn heat_capacity_of(&self, def: &MaterialDef) -> f32 {
        let capacity = def.effective_heat_capacity(self.default_heat_capacity);
        if capacity.is_finite() && capacity > 0.0 {
            capacity
        } else {
            tsubu_simulation::DEFAULT_HEAT_CAPACITY
        }
    }

    /// Conductivity of a material, never negative or NaN
    pub fn conductivity_of(&self, def: &MaterialDef) -> f32 {
        let conductivity = def.effective_conductivity(self.default_conductivity);
        if conductivity.is_finite() && conductivity >= 0.0 {
            conductivity
        } else {
            tsubu_simulation::DEFAULT_HEAT_CONDUCTIVITY
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Sideways cells per tick for a liquid with zero viscosity
    pub max_liquid_spread: u32,
    /// Neighborhood radius used to weigh gas spreading
    pub gas_spread_radius: i32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_liquid_spread: 5,
            gas_spread_radius: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectricalConfig {
    /// Charge lifetime for conductive materials that do not set one
    pub default_charge_lifetime: u8,
}

impl Default for ElectricalConfig {
    fn default() -> Self {
        Self {
            default_charge_lifetime: 3,
        }
    }
}

/// Advanced physics extension settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Start with the extension enabled
    pub enabled: bool,
    /// Particle cells per field cell along each axis
    pub field_cell_size: u32,
    /// Multiplier applied to pressure and velocity every tick
    pub field_decay: f32,
    /// Pressure change per unit of velocity divergence
    pub pressure_response: f32,
    /// Velocity change per unit of pressure gradient
    pub velocity_response: f32,
    /// Fraction of relative speed kept after a collision
    pub restitution: f32,
    /// Degrees per unit of kinetic energy lost in collisions
    pub collision_heat_factor: f32,
    /// Per-tick velocity multiplier for particles
    pub particle_damping: f32,
    /// Fraction of particle momentum handed back to the field
    pub air_coupling: f32,
    /// Cells per tick
    pub max_speed: f32,
    pub mass_attraction: bool,
    pub attraction_strength: f32,
    /// Radius in field cells
    pub attraction_radius: i32,
    pub attraction_softening: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            field_cell_size: 4,
            field_decay: 0.9,
            pressure_response: 0.25,
            velocity_response: 0.25,
            restitution: 0.6,
            collision_heat_factor: 1.0,
            particle_damping: 0.95,
            air_coupling: 0.05,
            max_speed: 4.0,
            mass_attraction: false,
            attraction_strength: 0.02,
            attraction_radius: 8,
            attraction_softening: 1.0,
        }
    }
}

impl SimConfig {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: &str| Err(SimError::InvalidConfig(msg.to_string()));

        if self.width == 0 || self.height == 0 {
            return invalid("grid dimensions must be positive");
        }
        if self.width > i32::MAX as u32 || self.height > i32::MAX as u32 {
            return invalid("grid dimensions exceed the coordinate range");
        }
        if !self.ambient_temperature.is_finite() {
            return invalid("ambient temperature must be finite");
        }
        if self.thermal.rate < 0.0 || !self.thermal.rate.is_finite() {
            return invalid("thermal rate must be a non-negative number");
        }
        if !self.thermal.default_heat_capacity.is_finite() || self.thermal.default_heat_capacity <= 0.0 {
            return invalid("default heat capacity must be a positive number");
        }
        if !self.thermal.default_conductivity.is_finite() || self.thermal.default_conductivity < 0.0 {
            return invalid("default conductivity must be a non-negative number");
        }
        if self.thermal.min_temperature >= self.thermal.max_temperature {
            return invalid("thermal temperature bounds are inverted");
        }
        if self.physics.field_cell_size == 0 {
            return invalid("field cell size must be positive");
        }
        if !(0.0..=1.0).contains(&self.physics.field_decay) {
            return invalid("field decay must lie in 0.0..=1.0");
        }
        if !(0.0..=1.0).contains(&self.physics.restitution) {
            return invalid("restitution must lie in 0.0..=1.0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        SimConfig::default().validate().unwrap();
        assert!(!SimConfig::default().physics.enabled);
        assert_eq!(SimConfig::default().physics.field_cell_size, 4);
    }

    #[test]
    fn test_rejects_empty_grid() {
        let config = SimConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_degenerate_thermal_defaults() {
        for capacity in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let mut config = SimConfig::default();
            config.thermal.default_heat_capacity = capacity;
            assert!(config.validate().is_err(), "capacity {capacity} accepted");
        }
        let mut config = SimConfig::default();
        config.thermal.default_conductivity = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_restitution() {
        let mut config = SimConfig::default();
        config.physics.restitution = 1.5;
        assert!(config.validate().is_err());
    }
}
