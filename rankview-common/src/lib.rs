//! # rankview Common Library
//!
//! Shared code for the rankview reconstruction engine and its hosts:
//! - Color channel identities and per-channel containers
//! - Factor set and image dimension types
//! - Binary wire codec for decomposition service payloads
//! - Error types
//! - Configuration loading

pub mod channel;
pub mod config;
pub mod error;
pub mod factor;
pub mod wire;

pub use channel::{Channel, PerChannel};
pub use error::{Error, Result, UnitFault};
pub use factor::{Dimensions, FactorSet};
