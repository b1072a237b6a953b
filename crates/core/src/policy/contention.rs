//! Carrier sense with random backoff on one shared channel.
//!
//! Each round every user with a pending packet senses the medium once, at the
//! later of the round start and the end of its own backoff. The first to find
//! the medium free holds it for the packet's airtime; everyone sensing while
//! it is held draws a fresh backoff and tries again next round.

use std::time::Duration;

use super::{complete_head, user_mut, AccessPolicy, PolicyKind, RoundOutcome};
use crate::{
    channel::{Holder, SharedChannel},
    config::{ContentionConfig, RadioConfig},
    error::SimulationError,
    simulation::{EventType, Scheduler, SimulationRng},
    station::{User, UserId},
};

pub struct ContentionPolicy {
    channel: SharedChannel,
    rng: SimulationRng,
    transmission: Duration,
    max_backoff_ms: u64,
    /// Earliest time each user may sense the medium again.
    ready_at: Vec<Duration>,
}

impl ContentionPolicy {
    pub fn new(radio: &RadioConfig, config: &ContentionConfig, rng: SimulationRng) -> Self {
        let airtime = radio.airtime(radio.bandwidth_mhz).as_secs_f64() * config.airtime_overhead_factor;
        let transmission = Duration::try_from_secs_f64(airtime)
            .unwrap_or(Duration::MAX)
            .saturating_add(Duration::from_millis(config.protocol_overhead_ms));
        Self {
            channel: SharedChannel::new(),
            rng,
            transmission,
            max_backoff_ms: config.max_backoff_ms.max(1),
            ready_at: Vec::new(),
        }
    }

    /// Time a packet holds the medium, protocol overhead included.
    pub fn transmission_delay(&self) -> Duration {
        self.transmission
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    fn draw_backoff(&mut self) -> Duration {
        self.rng.gen_millis(1..=self.max_backoff_ms)
    }

    fn on_attempt(
        &mut self,
        user: UserId,
        users: &mut [User],
        scheduler: &mut Scheduler,
        outcome: &mut RoundOutcome,
    ) -> Result<(), SimulationError> {
        let now = scheduler.now();
        if !self.channel.is_free() {
            let backoff = self.draw_backoff();
            self.ready_at[user.index()] = now + backoff;
            outcome.backoffs.push(backoff);
            tracing::trace!(%user, ?backoff, "Medium busy, backing off");
            return Ok(());
        }

        self.channel.occupy(Holder::User(user))?;
        user_mut(users, user)?
            .start_next(now)
            .ok_or(SimulationError::QueueInvariant {
                user,
                detail: "acquired the medium with nothing to send",
            })?;
        scheduler.schedule_after(
            self.transmission,
            EventType::TransmissionComplete { user, channel: 0 },
        );
        Ok(())
    }
}

impl AccessPolicy for ContentionPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Contention
    }

    fn run_round(
        &mut self,
        users: &mut [User],
        scheduler: &mut Scheduler,
    ) -> Result<RoundOutcome, SimulationError> {
        if self.ready_at.len() != users.len() {
            self.ready_at = vec![Duration::ZERO; users.len()];
        }

        let round_start = scheduler.now();
        for user in users.iter().filter(|u| u.has_pending()) {
            let at = round_start.max(self.ready_at[user.id().index()]);
            scheduler.schedule_at(at, EventType::AccessAttempt { user: user.id() });
        }

        let mut outcome = RoundOutcome::default();
        while let Some(event) = scheduler.step() {
            match event.event_type {
                EventType::AccessAttempt { user } => {
                    self.on_attempt(user, users, scheduler, &mut outcome)?;
                }
                EventType::TransmissionComplete { user, .. } => {
                    self.channel.release()?;
                    let delivery = complete_head(users, user, event.at())?;
                    self.ready_at[user.index()] = event.at();
                    outcome.deliveries.push(delivery);
                }
            }
        }

        tracing::debug!(
            delivered = outcome.deliveries.len(),
            backoffs = outcome.backoffs.len(),
            now = ?scheduler.now(),
            "Contention round finished"
        );
        Ok(outcome)
    }
}
