//! Material simulation data and reactions for tsubu
//!
//! This crate provides the foundational data types for material simulation:
//! - Material definitions (MaterialId, MaterialDef, Materials)
//! - Behavior categories and custom motion functions (BehaviorCategory, CustomBehavior)
//! - Neighbor reactions (ReactionRule, ReactionRegistry)
//! - Particle types (Particle, particle_flags, Scratch)
//! - Declarative registry loading from RON (MaterialFile)

mod custom;
mod error;
mod loader;
mod materials;
mod particle;
mod reactions;

pub use custom::{CustomBehavior, CustomBehaviorTable, CustomMotionFn, MotionContext};
pub use error::RegistryError;
pub use loader::{
    BehaviorSpec, FlammabilitySpec, HookSpec, LifetimeSpec, MaterialFile, MaterialSpec,
    OutcomeSpec, ReactionSpec, TransitionSpec,
};
pub use materials::{
    BehaviorCategory, ChargeGate, DEFAULT_HEAT_CAPACITY, DEFAULT_HEAT_CONDUCTIVITY, Flammability,
    Lifetime, MaterialDef, MaterialId, Materials, PhaseTransition,
};
pub use particle::{
    ElectricState, Kinetics, Particle, SCRATCH_SLOTS, Scratch, particle_flags, scratch_slot,
};
pub use reactions::{Outcome, ReactionHook, ReactionRegistry, ReactionRule};
