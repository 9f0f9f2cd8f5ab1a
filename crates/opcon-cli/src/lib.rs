//! Operator console CLI - fleet simulation tools.
//!
//! This crate provides the `sim_fleet` binary: a multi-drone simulator
//! that streams telemetry to the console server and flies whatever
//! mission the server hands back.

pub mod sim;

pub use sim::{ConsoleClient, SimDrone};
