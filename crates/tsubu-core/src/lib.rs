//! Falling-sand materials engine
//!
//! The [`World`] owns a fixed-size particle grid and advances it one tick
//! at a time through fixed phases: behavior, thermal, reaction, electrical
//! and (when enabled) advanced physics.

pub mod config;
pub mod error;
pub mod physics;
pub mod world;

// Re-export the registry crate under a stable path
pub mod simulation {
    pub use tsubu_simulation::*;
}

pub use config::{BehaviorConfig, ElectricalConfig, PhysicsConfig, SimConfig, ThermalConfig};
pub use error::{SimError, SimResult};
pub use world::{GridState, NoopStats, SimStats, TickCounters, World};
