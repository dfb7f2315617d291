//! Message protocol between the orchestrator and execution units
//!
//! Every request and response kind is a variant here and both ends match
//! exhaustively, so adding a message kind is a compile error until handled.
//! Nothing crosses the unit boundary except these values; factor buffers and
//! reconstructed planes are moved inside them.

use super::image::ChannelReconstruction;
use rankview_common::{Channel, FactorSet, UnitFault};
use std::fmt;

/// Request tag, strictly increasing per orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Orchestrator -> execution unit
#[derive(Debug)]
pub enum UnitRequest {
    /// Replace the unit's factor set
    Upload {
        factors: FactorSet,
        generation: Generation,
    },

    /// Rebuild the channel at `rank` (clamped by the unit)
    Reconstruct { rank: usize, generation: Generation },
}

/// Execution unit -> orchestrator
#[derive(Debug)]
pub enum UnitResponse {
    Uploaded {
        channel: Channel,
        generation: Generation,
    },

    Reconstructed {
        channel: Channel,
        generation: Generation,
        rank: usize,
        data: ChannelReconstruction,
    },

    Failed {
        channel: Channel,
        generation: Generation,
        fault: UnitFault,
    },
}

impl UnitResponse {
    pub fn channel(&self) -> Channel {
        match self {
            UnitResponse::Uploaded { channel, .. }
            | UnitResponse::Reconstructed { channel, .. }
            | UnitResponse::Failed { channel, .. } => *channel,
        }
    }

    pub fn generation(&self) -> Generation {
        match self {
            UnitResponse::Uploaded { generation, .. }
            | UnitResponse::Reconstructed { generation, .. }
            | UnitResponse::Failed { generation, .. } => *generation,
        }
    }
}
