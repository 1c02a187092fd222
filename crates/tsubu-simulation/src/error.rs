use crate::MaterialId;

/// Errors raised while building or loading a material registry.
///
/// All of these are fatal: a registry that fails validation must never be
/// handed to a running simulation.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown material `{name}` referenced by {context}")]
    UnknownMaterial { name: String, context: String },

    #[error("material `{0}` is defined more than once")]
    DuplicateMaterial(String),

    #[error("material id {0} is assigned to more than one material")]
    DuplicateId(MaterialId),

    #[error("material id {id} referenced by {context} is not registered")]
    DanglingId { id: MaterialId, context: String },

    #[error("probability {value} of {context} is outside 0.0..=1.0")]
    InvalidProbability { value: f32, context: String },

    #[error("temperature window of {context} has min {min} above max {max}")]
    InvalidTemperatureWindow { min: f32, max: f32, context: String },

    #[error("{0} is both bidirectional and one-way")]
    ConflictingDirection(String),

    #[error("unknown custom behavior `{name}` on material `{material}`")]
    UnknownCustomBehavior { name: String, material: String },

    #[error("registry has no fallback material at id 0")]
    NoFallback,

    #[error("failed to parse material file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to read material file: {0}")]
    Io(#[from] std::io::Error),
}
