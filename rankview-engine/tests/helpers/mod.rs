//! Test helper modules for rankview-engine integration tests
//!
//! - fixtures: factor sets with hand-checkable reconstructions
//! - test_server: local decomposition service stand-in

#![allow(dead_code)]

pub mod fixtures;
pub mod test_server;

pub use fixtures::{identity_sets, payload_for, scenario_sets, with_channel};
pub use test_server::{ServiceReply, TestService};
