//! Round-robin over equally sized sub-channels.
//!
//! The total bandwidth is cut into `total / width` sub-channels. In every round
//! slot `i` goes to the user `cursor + i` positions along the ring, and the
//! cursor then moves on by the number of slots, so every user is offered a
//! slot at least once every `ceil(users / slots)` rounds. All slots of a round
//! transmit side by side and the round lasts exactly one slot time, whether
//! or not a slot carried anything.

use std::time::Duration;

use super::{complete_head, user_mut, AccessPolicy, PolicyKind, RoundOutcome};
use crate::{
    channel::{Holder, SubChannelSet},
    config::{PartitionedConfig, RadioConfig},
    error::{ConfigError, SimulationError},
    simulation::{EventType, Scheduler},
    station::{User, UserId},
};

pub struct PartitionedPolicy {
    sub_channels: SubChannelSet,
    slot_time: Duration,
    cursor: usize,
}

impl PartitionedPolicy {
    pub fn new(
        radio: &RadioConfig,
        config: &PartitionedConfig,
        sub_channel_mhz: u32,
    ) -> Result<Self, ConfigError> {
        let sub_channels = SubChannelSet::split(radio.bandwidth_mhz, sub_channel_mhz);
        if sub_channels.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{sub_channel_mhz} MHz sub-channels leave no usable slot in {} MHz",
                radio.bandwidth_mhz
            )));
        }
        let floor = Duration::from_millis(config.min_transmission_ms);
        Ok(Self {
            sub_channels,
            slot_time: radio.airtime(sub_channel_mhz).max(floor),
            cursor: 0,
        })
    }

    pub fn num_sub_channels(&self) -> usize {
        self.sub_channels.len()
    }

    pub fn slot_time(&self) -> Duration {
        self.slot_time
    }

    /// Users owning each slot of the next round, indexed by sub-channel.
    pub fn slot_assignment(&self, user_count: usize) -> Vec<UserId> {
        if user_count == 0 {
            return Vec::new();
        }
        (0..self.num_sub_channels())
            .map(|slot| UserId::new((self.cursor + slot) % user_count))
            .collect()
    }
}

impl AccessPolicy for PartitionedPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Partitioned {
            sub_channel_mhz: self.sub_channels.width_mhz(),
        }
    }

    fn run_round(
        &mut self,
        users: &mut [User],
        scheduler: &mut Scheduler,
    ) -> Result<RoundOutcome, SimulationError> {
        let mut outcome = RoundOutcome::default();
        if users.is_empty() {
            return Ok(outcome);
        }

        let start = scheduler.now();
        let end = start.saturating_add(self.slot_time);
        for (slot, user) in self.slot_assignment(users.len()).into_iter().enumerate() {
            if user_mut(users, user)?.start_next(start).is_none() {
                outcome.wasted_slots += 1;
                continue;
            }
            self.sub_channels.occupy(slot, Holder::User(user))?;
            scheduler.schedule_at(
                end,
                EventType::TransmissionComplete {
                    user,
                    channel: slot,
                },
            );
        }

        for event in scheduler.drain_until(end) {
            if let EventType::TransmissionComplete { user, channel } = event.event_type {
                self.sub_channels.release(channel)?;
                outcome
                    .deliveries
                    .push(complete_head(users, user, event.at())?);
            }
        }
        self.cursor = (self.cursor + self.num_sub_channels()) % users.len();

        tracing::debug!(
            delivered = outcome.deliveries.len(),
            wasted = outcome.wasted_slots,
            now = ?scheduler.now(),
            "Partitioned round finished"
        );
        Ok(outcome)
    }

    fn stall_tolerance(&self, user_count: usize) -> u64 {
        user_count.div_ceil(self.num_sub_channels()) as u64
    }
}
