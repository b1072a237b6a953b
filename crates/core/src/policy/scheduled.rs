//! Coordinator-scheduled access: broadcast, channel-state exchange, then a
//! bounded parallel transmission window.
//!
//! Transmissions that would finish after the window closes are taken off the
//! air and retried next round. This deferral is inherited behaviour of the
//! model being reproduced, not a fairness mechanism; at high user counts it
//! shows up as rounds that deliver little or nothing for some users.

use std::time::Duration;

use super::{complete_head, user_mut, AccessPolicy, PolicyKind, RoundOutcome};
use crate::{
    channel::{Holder, SharedChannel},
    config::{RadioConfig, ScheduledConfig},
    error::SimulationError,
    simulation::{EventType, Scheduler},
    station::{User, UserId},
};

pub struct ScheduledPolicy {
    channel: SharedChannel,
    broadcast: Duration,
    csi_exchange: Duration,
    window: Duration,
    transmission: Duration,
    spatial_streams: Option<usize>,
}

impl ScheduledPolicy {
    pub fn new(radio: &RadioConfig, config: &ScheduledConfig) -> Self {
        let floor = Duration::from_millis(config.min_transmission_ms);
        Self {
            channel: SharedChannel::new(),
            broadcast: Duration::from_millis(config.broadcast_ms),
            csi_exchange: Duration::from_millis(config.csi_exchange_ms),
            window: Duration::from_millis(config.window_ms),
            transmission: radio.airtime(radio.bandwidth_mhz).max(floor),
            spatial_streams: config.spatial_streams.filter(|s| *s > 0),
        }
    }

    pub fn transmission_delay(&self) -> Duration {
        self.transmission
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Offset from the window start at which the `k`-th transmitter starts.
    fn start_offset(&self, k: usize) -> Duration {
        let wave = self.spatial_streams.map_or(0, |streams| k / streams);
        self.transmission
            .saturating_mul(u32::try_from(wave).unwrap_or(u32::MAX))
    }

    /// Holds the medium for `duration` on behalf of `holder`.
    fn hold(
        &mut self,
        holder: Holder,
        duration: Duration,
        scheduler: &mut Scheduler,
    ) -> Result<(), SimulationError> {
        self.channel.occupy(holder)?;
        scheduler.advance(duration);
        self.channel.release()?;
        Ok(())
    }
}

impl AccessPolicy for ScheduledPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Scheduled
    }

    fn run_round(
        &mut self,
        users: &mut [User],
        scheduler: &mut Scheduler,
    ) -> Result<RoundOutcome, SimulationError> {
        let mut outcome = RoundOutcome::default();

        self.hold(Holder::AccessPoint, self.broadcast, scheduler)?;

        let contenders: Vec<UserId> = users
            .iter()
            .filter(|u| u.has_pending())
            .map(User::id)
            .collect();
        for &user in &contenders {
            self.hold(Holder::User(user), self.csi_exchange, scheduler)?;
        }

        let window_start = scheduler.now();
        let window_end = window_start.saturating_add(self.window);
        self.channel.occupy(Holder::AccessPoint)?;

        for (k, &user) in contenders.iter().enumerate() {
            let start = window_start.saturating_add(self.start_offset(k));
            if start >= window_end {
                outcome.deferred += 1;
                continue;
            }
            user_mut(users, user)?
                .start_next(start)
                .ok_or(SimulationError::QueueInvariant {
                    user,
                    detail: "scheduled with nothing to send",
                })?;
            let stream = self.spatial_streams.map_or(k, |streams| k % streams);
            scheduler.schedule_at(
                start.saturating_add(self.transmission),
                EventType::TransmissionComplete {
                    user,
                    channel: stream,
                },
            );
        }

        for event in scheduler.drain_until(window_end) {
            let delivery = complete_head(users, event.event_type.user(), event.at())?;
            outcome.deliveries.push(delivery);
        }
        for event in scheduler.drain_pending() {
            let user = event.event_type.user();
            let deferred = user_mut(users, user)?.defer_in_flight();
            outcome.deferred += deferred as u64;
            tracing::trace!(%user, "Transmission crosses the window boundary, deferred");
        }
        self.channel.release()?;

        if outcome.deferred > 0 {
            tracing::warn!(
                deferred = outcome.deferred,
                delivered = outcome.deliveries.len(),
                "Window closed with transmissions outstanding"
            );
        }
        tracing::debug!(
            contenders = contenders.len(),
            delivered = outcome.deliveries.len(),
            now = ?scheduler.now(),
            "Scheduled round finished"
        );
        Ok(outcome)
    }
}
