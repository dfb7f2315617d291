//! # rankview Reconstruction Engine (rankview-engine)
//!
//! Channel-parallel truncated reconstruction of images whose color channels
//! have been factored into `U * diag(S) * Vt` by an external service.
//!
//! **Purpose:** Hold one factor set per channel in an isolated execution unit,
//! rebuild pixel intensities at any requested rank, compose RGBA images and
//! report fidelity metrics, while rank changes arrive faster than
//! reconstructions complete.
//!
//! **Architecture:** three OS-thread execution units driven by a single async
//! orchestrator over tokio channels; generation tags filter stale replies.

pub mod metrics;
pub mod reconstruct;
pub mod service;
pub mod session;
pub mod throttle;

pub use rankview_common::{Error, Result};
pub use metrics::Metrics;
pub use reconstruct::{Orchestrator, Rendered};
pub use service::{DecompositionService, HttpDecompositionService};
pub use session::{Session, SessionUpdate};
pub use throttle::{RankThrottle, ThrottleDecision};
