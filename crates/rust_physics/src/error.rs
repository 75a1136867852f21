//! Error types shared across the physics core

use crate::config::ConfigError;
use std::collections::TryReserveError;

/// Errors returned by world, collider, shape and joint construction
#[derive(thiserror::Error, Debug)]
pub enum PhysicsError {
    /// The world configuration was rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A shape parameter is non-positive, non-finite or degenerate
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Joint endpoints were issued by different worlds
    #[error("Joint endpoints belong to different worlds")]
    CrossWorldJoint,

    /// An allocation could not be satisfied
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    /// A handle is stale, belongs to another world, or names the wrong object
    #[error("Invalid or stale handle")]
    InvalidHandle,

    /// Mesh and terrain shapes need caller-supplied mass on dynamic bodies
    #[error("Mesh and terrain shapes require explicit mass data on dynamic colliders")]
    MassRequired,
}

/// Result alias used throughout the crate
pub type PhysicsResult<T> = Result<T, PhysicsError>;

impl PhysicsError {
    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry(message.into())
    }
}
