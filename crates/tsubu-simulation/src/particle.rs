//! Particle types and constants
//!
//! Foundational types for the cell-based simulation.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::{MaterialDef, MaterialId};

/// Number of general-purpose scratch slots per particle
pub const SCRATCH_SLOTS: usize = 4;

/// Scratch slot assignments shared by the engine
pub mod scratch_slot {
    pub const LIFETIME: usize = 0; // Ticks left for materials with a lifetime
    pub const STATE: usize = 1; // Material sub-state (switch closed, drift heading)
    pub const TIMER: usize = 2; // Free countdown for custom motion
    pub const BURN: usize = 3; // Ticks left while burning
}

/// Small fixed set of numeric memory slots
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scratch(pub [i32; SCRATCH_SLOTS]);

impl Scratch {
    /// Slot value (0 for out-of-range slots)
    pub fn get(&self, slot: usize) -> i32 {
        self.0.get(slot).copied().unwrap_or(0)
    }

    pub fn set(&mut self, slot: usize, value: i32) {
        if let Some(entry) = self.0.get_mut(slot) {
            *entry = value;
        }
    }
}

/// Electrical signal state
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectricState {
    /// Remaining lifetime of the charge marker (0 = uncharged)
    pub charge: u8,
    /// Refractory ticks left before the particle accepts charge again
    pub cooldown: u8,
}

impl ElectricState {
    pub fn is_charged(&self) -> bool {
        self.charge > 0
    }

    /// Can this particle take a new charge marker
    pub fn accepts_charge(&self) -> bool {
        self.charge == 0 && self.cooldown == 0
    }
}

/// Continuous motion state (advanced physics only)
#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kinetics {
    /// Cells per tick
    pub velocity: Vec2,
    /// Accumulated sub-cell displacement
    pub offset: Vec2,
}

/// Flag bits for particle state
pub mod particle_flags {
    pub const MOVED: u16 = 1 << 0; // Already moved this tick
    pub const BURNING: u16 = 1 << 1; // Currently on fire
    pub const REACTED: u16 = 1 << 2; // Took part in a reaction this tick
    pub const CHARGED_THIS_TICK: u16 = 1 << 3; // Received charge during this tick's propagation

    /// Flags that only live for a single tick
    pub const PER_TICK: u16 = MOVED | REACTED | CHARGED_THIS_TICK;
}

/// A single particle occupying one grid cell
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Grid coordinates, always equal to the slot holding the particle
    pub position: IVec2,
    pub material: MaterialId,
    /// Degrees Celsius
    pub temperature: f32,
    pub flags: u16,
    pub electric: ElectricState,
    pub scratch: Scratch,
    /// Material to restore when a remembering transition is reversed
    pub origin: Option<MaterialId>,
    /// Present only while advanced physics is enabled
    pub kinetics: Option<Kinetics>,
}

impl Particle {
    pub fn new(position: IVec2, material: MaterialId, temperature: f32) -> Self {
        Self {
            position,
            material,
            temperature,
            flags: 0,
            electric: ElectricState::default(),
            scratch: Scratch::default(),
            origin: None,
            kinetics: None,
        }
    }

    /// Fresh particle with the material's initial scratch state
    pub fn spawn(position: IVec2, def: &MaterialDef, temperature: f32) -> Self {
        Self {
            scratch: def.initial_scratch(),
            ..Self::new(position, def.id, temperature)
        }
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u16) {
        self.flags |= flag;
    }

    pub fn clear_flag(&mut self, flag: u16) {
        self.flags &= !flag;
    }

    pub fn is_burning(&self) -> bool {
        self.has_flag(particle_flags::BURNING)
    }

    /// Ticks left before a lifetime-limited particle decays
    pub fn lifetime_remaining(&self) -> i32 {
        self.scratch.get(scratch_slot::LIFETIME)
    }

    pub fn set_lifetime_remaining(&mut self, ticks: i32) {
        self.scratch.set(scratch_slot::LIFETIME, ticks);
    }

    pub fn burn_remaining(&self) -> i32 {
        self.scratch.get(scratch_slot::BURN)
    }

    pub fn set_burn_remaining(&mut self, ticks: i32) {
        self.scratch.set(scratch_slot::BURN, ticks);
    }

    pub fn is_switch_closed(&self) -> bool {
        self.scratch.get(scratch_slot::STATE) != 0
    }

    pub fn set_switch_closed(&mut self, closed: bool) {
        self.scratch.set(scratch_slot::STATE, i32::from(closed));
    }

    /// Change material in place
    ///
    /// Keeps position, temperature and charge. Scratch is reset to the new
    /// material's initial state and burning stops. Kinetics are dropped when
    /// the new material is solid. The origin field is left to the caller.
    pub fn transform_into(&mut self, def: &MaterialDef) {
        self.material = def.id;
        self.scratch = def.initial_scratch();
        self.clear_flag(particle_flags::BURNING);
        if def.behavior.is_solid() {
            self.kinetics = None;
        }
    }
}
