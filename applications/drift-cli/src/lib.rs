//! Drift command-line player
//!
//! Runs the playback engine against simulated collaborators: a generated
//! catalog, a caching stream resolver and a clock-driven virtual engine.

pub mod config;
pub mod session;
pub mod simulation;

pub use config::{DriftConfig, SimulationConfig};
pub use session::{follow, Output, SessionReport};
pub use simulation::Simulation;
