//! Simulated drone fleet.

pub mod client;
pub mod drone;

pub use client::{ConsoleClient, Tasking};
pub use drone::SimDrone;
