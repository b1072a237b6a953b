//! Deterministic simulation primitives.
//!
//! This module provides the infrastructure every access policy runs on:
//!
//! - **VirtualTime**: time that only advances when explicitly stepped
//! - **SimulationRng**: seeded RNG for all random decisions during a run
//! - **Scheduler**: deterministic event queue ordered by completion time,
//!   owning the run's virtual clock
//!
//! Transmissions are never modelled by blocking the thread. A policy
//! schedules the completion of each transmission on the [`Scheduler`] and the
//! clock jumps straight to the next completion, so runs are fast and
//! reproducible from their seed.

mod rng;
mod scheduler;
mod time;

pub use rng::SimulationRng;
pub use scheduler::{Event, EventId, EventType, Scheduler, SchedulerConfig};
pub use time::VirtualTime;
