//! Channel-access disciplines.
//!
//! Every discipline implements [`AccessPolicy`]: given the users of a scenario
//! and the run's [`Scheduler`], advance exactly one round of simulated time and
//! report what was delivered. The driver loops rounds until every queue is
//! empty and never needs to know which discipline it is running.

use std::{fmt::Display, time::Duration};

use serde::Serialize;

use crate::{
    config::SimulationConfig,
    error::{ConfigError, SimulationError},
    simulation::{Scheduler, SimulationRng},
    station::{Delivery, User, UserId},
};

mod contention;
mod partitioned;
mod scheduled;

pub use contention::ContentionPolicy;
pub use partitioned::PartitionedPolicy;
pub use scheduled::ScheduledPolicy;

/// Which discipline a policy implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "discipline", rename_all = "snake_case")]
pub enum PolicyKind {
    /// Carrier sense with random backoff on a single shared channel.
    Contention,
    /// Broadcast, serial channel-state exchange, then a parallel window.
    Scheduled,
    /// Round-robin over equally sized sub-channels.
    Partitioned { sub_channel_mhz: u32 },
}

impl Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::Contention => write!(f, "contention"),
            PolicyKind::Scheduled => write!(f, "scheduled"),
            PolicyKind::Partitioned { sub_channel_mhz } => {
                write!(f, "partitioned ({sub_channel_mhz} MHz sub-channels)")
            }
        }
    }
}

/// Everything that happened during one round.
#[derive(Debug, Default, Clone)]
pub struct RoundOutcome {
    /// Packets delivered this round, in completion order.
    pub deliveries: Vec<Delivery>,
    /// Backoff durations drawn this round.
    pub backoffs: Vec<Duration>,
    /// Slots offered to users with nothing waiting.
    pub wasted_slots: u64,
    /// Transmissions pushed back to the next round.
    pub deferred: u64,
}

impl RoundOutcome {
    pub fn made_progress(&self) -> bool {
        !self.deliveries.is_empty()
    }
}

/// A channel-access discipline, driven one round at a time.
pub trait AccessPolicy {
    fn kind(&self) -> PolicyKind;

    /// Advances one round.
    ///
    /// Implementations may keep per-user bookkeeping indexed by position but
    /// must not hold on to the users between calls. Every event a round
    /// schedules is consumed before the round returns.
    fn run_round(
        &mut self,
        users: &mut [User],
        scheduler: &mut Scheduler,
    ) -> Result<RoundOutcome, SimulationError>;

    /// Consecutive rounds without a delivery that still count as progress.
    fn stall_tolerance(&self, _user_count: usize) -> u64 {
        0
    }
}

/// Builds the policy for `kind` from the run configuration.
pub fn build_policy(
    kind: PolicyKind,
    config: &SimulationConfig,
    rng: SimulationRng,
) -> Result<Box<dyn AccessPolicy>, ConfigError> {
    Ok(match kind {
        PolicyKind::Contention => Box::new(ContentionPolicy::new(
            &config.radio,
            &config.contention,
            rng,
        )),
        PolicyKind::Scheduled => Box::new(ScheduledPolicy::new(&config.radio, &config.scheduled)),
        PolicyKind::Partitioned { sub_channel_mhz } => Box::new(PartitionedPolicy::new(
            &config.radio,
            &config.partitioned,
            sub_channel_mhz,
        )?),
    })
}

pub(crate) fn user_mut(users: &mut [User], id: UserId) -> Result<&mut User, SimulationError> {
    users
        .get_mut(id.index())
        .ok_or(SimulationError::QueueInvariant {
            user: id,
            detail: "event refers to a user outside the scenario",
        })
}

pub(crate) fn complete_head(
    users: &mut [User],
    id: UserId,
    at: Duration,
) -> Result<Delivery, SimulationError> {
    user_mut(users, id)?
        .complete_head(at)
        .ok_or(SimulationError::QueueInvariant {
            user: id,
            detail: "completion for a packet that was not in flight",
        })
}
