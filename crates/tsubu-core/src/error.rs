//! Engine error types

use tsubu_simulation::RegistryError;

/// Errors returned by grid and world operations
///
/// A failed operation never leaves partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("position ({x}, {y}) is outside the grid")]
    OutOfBounds { x: i32, y: i32 },

    #[error("position ({x}, {y}) is already occupied")]
    SlotOccupied { x: i32, y: i32 },

    #[error("position ({x}, {y}) is empty")]
    EmptySlot { x: i32, y: i32 },

    #[error("non-finite value for ({x}, {y})")]
    NotFinite { x: i32, y: i32 },

    #[error("particle in slot ({x}, {y}) claims position ({stored_x}, {stored_y})")]
    Inconsistent {
        x: i32,
        y: i32,
        stored_x: i32,
        stored_y: i32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("material registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

pub type SimResult<T> = Result<T, SimError>;
