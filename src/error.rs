//! Engine error taxonomy
//!
//! Nothing in here is fatal to the process. Every variant is either recovered
//! where it is raised or disables one rendering stage until it is rebuilt.

use std::fmt;

use crate::gpu::TextureId;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A fragment program could not be built for this device.
    ResourceBuildFailure { program: &'static str, reason: String },
    /// The input image reported a non-positive size or a short pixel buffer.
    InvalidInputDimensions { width: i64, height: i64 },
    /// A channel asked for a preset that is not registered.
    UnknownPreset(String),
    /// A draw call bound its own render target as a sampler.
    FeedbackLoop,
    /// A handle that was never allocated or has been released.
    MissingTexture(TextureId),
    /// Requested storage exceeds the device limits.
    TextureTooLarge { width: u32, height: u32, max: u32 },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceBuildFailure { program, reason } => {
                write!(f, "failed to build '{}' program: {}", program, reason)
            },
            Self::InvalidInputDimensions { width, height } => {
                write!(f, "invalid input image dimensions {}x{}", width, height)
            },
            Self::UnknownPreset(name) => write!(f, "unknown preset '{}'", name),
            Self::FeedbackLoop => write!(f, "render target is also bound as a sampler"),
            Self::MissingTexture(id) => write!(f, "texture {:?} is not allocated", id),
            Self::TextureTooLarge { width, height, max } => {
                write!(f, "texture {}x{} exceeds device maximum {}", width, height, max)
            },
        }
    }
}

impl std::error::Error for EngineError {}
