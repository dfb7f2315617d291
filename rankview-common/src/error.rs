//! Common error types for rankview

use crate::channel::Channel;
use thiserror::Error;

/// Common result type for rankview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fault reported by an execution unit across the message boundary.
///
/// Units never panic or return `Err` to the orchestrator; every failure
/// travels back as one of these tags inside a response message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitFault {
    /// Factor set arrays do not agree with the declared width/height
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Reconstruct requested before any successful upload
    #[error("no factor set loaded")]
    NoFactorSetLoaded,

    /// Kernel failed while computing intensities
    #[error("compute failure: {0}")]
    ComputeFailure(String),
}

/// Common error types across rankview crates
#[derive(Error, Debug)]
pub enum Error {
    /// Payload byte length does not match the layout implied by width/height
    #[error("Invalid payload length: expected {expected} bytes, got {actual}")]
    InvalidPayloadLength { expected: usize, actual: usize },

    /// Width or height unusable (zero, or too large to address)
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// A single channel failed a logical request
    #[error("{channel} channel failed: {fault}")]
    Channel { channel: Channel, fault: UnitFault },

    /// Execution unit thread is no longer reachable
    #[error("{0} execution unit is unavailable")]
    UnitUnavailable(Channel),

    /// Every execution unit has stopped; the shared reply channel is closed
    #[error("All execution units have stopped")]
    UnitsStopped,

    /// Frame awaited while no reconstruction request is outstanding
    #[error("No reconstruction request is outstanding")]
    NoPendingRequest,

    /// Interactive session task has stopped
    #[error("Session closed")]
    SessionClosed,

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Decomposition service request failed
    #[error("Decomposition service error: {0}")]
    Service(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fault carried by a per-channel failure, if this is one
    pub fn unit_fault(&self) -> Option<&UnitFault> {
        match self {
            Error::Channel { fault, .. } => Some(fault),
            _ => None,
        }
    }
}
