//! World management - grid store, per-tick phases, and the scheduler

mod ca_update;
mod chemistry_system;
mod electrical_system;
mod grid;
mod neighbor_queries;
pub mod rng_trait;
mod snapshot;
pub mod stats;
mod thermal_system;
mod transform;
#[allow(clippy::module_inception)]
mod world;

pub use ca_update::{CellularAutomataUpdater, Displacement};
pub use chemistry_system::ChemistrySystem;
pub use electrical_system::ElectricalSystem;
pub use grid::Grid;
pub use neighbor_queries::{NeighborQueries, ORTHOGONAL};
pub use rng_trait::WorldRng;
pub use snapshot::GridState;
pub use stats::{NoopStats, SimStats, TickCounters};
pub use thermal_system::{ThermalSystem, exchange_energy};
pub use transform::{HookEvent, TransformSystem};
pub use world::World;
