//! Medium availability: one shared channel or a set of sub-channels.
//!
//! Both resources enforce the same invariant: at most one transmission holds a
//! given (sub-)channel at any instant. Occupying a busy channel is rejected
//! rather than silently overwritten.

use crate::station::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Free,
    Busy,
}

/// Who currently holds a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    /// The access point itself (broadcasts, control exchanges, windows).
    AccessPoint,
    User(UserId),
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel {channel} is already held by {holder:?}")]
    AlreadyBusy { channel: usize, holder: Holder },
    #[error("channel {channel} released while free")]
    NotHeld { channel: usize },
    #[error("no sub-channel {channel}, only {count} exist")]
    OutOfRange { channel: usize, count: usize },
}

/// A single shared medium with a Free/Busy flag.
#[derive(Debug, Clone, Default)]
pub struct SharedChannel {
    holder: Option<Holder>,
    acquisitions: u64,
}

impl SharedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChannelState {
        if self.holder.is_some() {
            ChannelState::Busy
        } else {
            ChannelState::Free
        }
    }

    pub fn is_free(&self) -> bool {
        self.holder.is_none()
    }

    /// Number of successful `Free -> Busy` transitions so far.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }

    pub fn occupy(&mut self, by: Holder) -> Result<(), ChannelError> {
        if let Some(holder) = self.holder {
            return Err(ChannelError::AlreadyBusy { channel: 0, holder });
        }
        self.holder = Some(by);
        self.acquisitions += 1;
        Ok(())
    }

    pub fn release(&mut self) -> Result<Holder, ChannelError> {
        self.holder
            .take()
            .ok_or(ChannelError::NotHeld { channel: 0 })
    }
}

/// A fixed set of equally sized, independently schedulable sub-channels.
#[derive(Debug, Clone)]
pub struct SubChannelSet {
    width_mhz: u32,
    slots: Vec<Option<Holder>>,
}

impl SubChannelSet {
    /// Splits `total_mhz` into `total_mhz / width_mhz` sub-channels.
    ///
    /// Any remainder bandwidth is left unused. The set is empty when the width
    /// is zero or wider than the total.
    pub fn split(total_mhz: u32, width_mhz: u32) -> Self {
        let count = total_mhz.checked_div(width_mhz).unwrap_or(0) as usize;
        Self {
            width_mhz,
            slots: vec![None; count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn width_mhz(&self) -> u32 {
        self.width_mhz
    }

    pub fn state(&self, channel: usize) -> Option<ChannelState> {
        self.slots.get(channel).map(|slot| match slot {
            Some(_) => ChannelState::Busy,
            None => ChannelState::Free,
        })
    }

    pub fn busy_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn occupy(&mut self, channel: usize, by: Holder) -> Result<(), ChannelError> {
        let count = self.slots.len();
        let slot = self
            .slots
            .get_mut(channel)
            .ok_or(ChannelError::OutOfRange { channel, count })?;
        if let Some(holder) = *slot {
            return Err(ChannelError::AlreadyBusy { channel, holder });
        }
        *slot = Some(by);
        Ok(())
    }

    pub fn release(&mut self, channel: usize) -> Result<Holder, ChannelError> {
        let count = self.slots.len();
        self.slots
            .get_mut(channel)
            .ok_or(ChannelError::OutOfRange { channel, count })?
            .take()
            .ok_or(ChannelError::NotHeld { channel })
    }
}
