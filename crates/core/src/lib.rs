//! Discrete-event simulation of three wireless channel-access disciplines.
//!
//! A population of users, each with a queue of equally sized packets, shares
//! a channel under one of:
//!
//! - contention: carrier sense with random backoff on the whole channel,
//! - scheduled: an access point broadcasts, collects channel state, then opens
//!   a bounded window in which users transmit in parallel,
//! - partitioned: the channel is cut into sub-channels handed out round-robin.
//!
//! Time is virtual. Nothing sleeps; the [`simulation::Scheduler`] orders
//! completion and access events and advances the clock, so a run with the
//! same seed and configuration always produces the same figures.

pub mod baseline;

pub mod channel;

/// Simulation parameters, layered from defaults, a TOML file and the command line.
pub mod config;

pub mod driver;

pub mod error;

pub mod input;

#[cfg(feature = "trace")]
mod logging;

pub mod metrics;

pub mod policy;

pub mod report;

/// Virtual clock, event queue and seeded randomness.
pub mod simulation;

/// Users and their packet queues.
pub mod station;

pub use config::{ConfigArgs, SimulationConfig};
pub use driver::{Scenario, ScenarioDriver, ScenarioOutcome, ScenarioReport};
pub use error::{ConfigError, InputError, SimulationError};
pub use metrics::{Measurement, Metrics};
pub use policy::{AccessPolicy, PolicyKind};
