//! Truncated reconstruction: kernel, execution units and orchestration

pub mod image;
pub mod kernel;
pub mod orchestrator;
pub mod protocol;
pub mod unit;

pub use image::{ChannelReconstruction, CompositeImage};
pub use kernel::PreparedFactors;
pub use orchestrator::{FanInStats, Orchestrator, Rendered};
pub use protocol::{Generation, UnitRequest, UnitResponse};
pub use unit::{ExecutionUnit, UnitState};
