//! Scenario actions

use serde::{Deserialize, Serialize};

use super::verification::VerificationCondition;

/// A single step of a scenario
///
/// Materials are referenced by registry name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioAction {
    // === PLACEMENT ===
    /// Create one particle in an empty cell
    Place {
        x: i32,
        y: i32,
        material: String,
        temperature: Option<f32>,
    },

    /// Fill a rectangle (inclusive), skipping occupied cells
    Fill {
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
        material: String,
        temperature: Option<f32>,
    },

    /// Delete the particle at a cell
    Remove { x: i32, y: i32 },

    /// Force the particle at a cell to become another material
    SetMaterial { x: i32, y: i32, material: String },

    // === TOOLS ===
    /// Add (or with a negative delta remove) heat at a cell
    Heat { x: i32, y: i32, delta: f32 },

    /// Charge a conductive particle
    Charge { x: i32, y: i32 },

    /// Flip a switch
    ToggleSwitch { x: i32, y: i32 },

    /// Heat burst plus field impulse
    Explode {
        x: i32,
        y: i32,
        radius: f32,
        strength: f32,
    },

    /// Turn the advanced physics extension on or off
    SetAdvancedPhysics { enabled: bool },

    // === TIME ===
    /// Advance the simulation
    WaitTicks { ticks: u64 },

    /// Advance until the condition holds, failing after `timeout_ticks`
    WaitUntil {
        condition: VerificationCondition,
        timeout_ticks: u64,
    },

    // === STATE ===
    /// Write a binary snapshot of the world
    SaveSnapshot { path: String },

    /// Replace the world with a previously saved snapshot
    LoadSnapshot { path: String },

    /// Add a line to the execution log
    Log { message: String },
}
