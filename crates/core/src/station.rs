//! Users and the packets they queue for transmission.

use std::{collections::VecDeque, fmt::Display, time::Duration};

use serde::Serialize;

/// Index of a user within a scenario. Users are numbered `0..user_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(usize);

impl UserId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

/// Sequence number of a packet within its user's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PacketId(u32);

impl PacketId {
    pub const fn new(seq: u32) -> Self {
        Self(seq)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketState {
    Pending,
    InFlight,
    Delivered,
}

/// A fixed-size data packet with its transmission timestamps.
///
/// Both timestamps are `None` until the packet goes on air; once delivered,
/// `end_time >= start_time`.
#[derive(Debug, Clone)]
pub struct Packet {
    id: PacketId,
    size_bytes: u32,
    state: PacketState,
    start_time: Option<Duration>,
    end_time: Option<Duration>,
}

impl Packet {
    pub fn new(id: PacketId, size_bytes: u32) -> Self {
        Self {
            id,
            size_bytes,
            state: PacketState::Pending,
            start_time: None,
            end_time: None,
        }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn size_bits(&self) -> u64 {
        u64::from(self.size_bytes) * 8
    }

    pub fn state(&self) -> PacketState {
        self.state
    }

    pub fn start_time(&self) -> Option<Duration> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Duration> {
        self.end_time
    }

    /// Puts the packet on air at `at`. Only a pending packet can start.
    fn begin(&mut self, at: Duration) -> bool {
        if self.state != PacketState::Pending {
            return false;
        }
        self.state = PacketState::InFlight;
        self.start_time = Some(at);
        true
    }

    /// Marks an in-flight packet delivered at `at` and returns its latency.
    fn complete(&mut self, at: Duration) -> Option<Duration> {
        let start = match (self.state, self.start_time) {
            (PacketState::InFlight, Some(start)) => start,
            _ => return None,
        };
        let end = at.max(start);
        self.state = PacketState::Delivered;
        self.end_time = Some(end);
        Some(end - start)
    }

    /// Takes an in-flight packet back off the air; it will be sent again later.
    fn defer(&mut self) -> bool {
        if self.state != PacketState::InFlight {
            return false;
        }
        self.state = PacketState::Pending;
        self.start_time = None;
        true
    }
}

/// A delivered packet as reported by a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub user: UserId,
    pub packet: PacketId,
    pub start_time: Duration,
    pub end_time: Duration,
}

impl Delivery {
    pub fn latency(&self) -> Duration {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// A station holding a FIFO queue of packets.
#[derive(Debug, Clone)]
pub struct User {
    id: UserId,
    queue: VecDeque<Packet>,
}

impl User {
    /// Creates a user with `packets` queued packets of `packet_size_bytes` each.
    pub fn new(id: UserId, packets: u32, packet_size_bytes: u32) -> Self {
        let queue = (0..packets)
            .map(|seq| Packet::new(PacketId::new(seq), packet_size_bytes))
            .collect();
        Self { id, queue }
    }

    /// Creates the users of one scenario, numbered from zero.
    pub fn population(count: usize, packets_per_user: u32, packet_size_bytes: u32) -> Vec<User> {
        (0..count)
            .map(|i| User::new(UserId::new(i), packets_per_user, packet_size_bytes))
            .collect()
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// True when at least one queued packet is not on air yet.
    pub fn has_waiting(&self) -> bool {
        self.queue.iter().any(|p| p.state() == PacketState::Pending)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn head(&self) -> Option<&Packet> {
        self.queue.front()
    }

    /// Puts the oldest waiting packet on air and returns its id.
    ///
    /// Packets start in queue order, so when several are in flight at once
    /// the head is always the earliest started.
    pub fn start_next(&mut self, at: Duration) -> Option<PacketId> {
        let packet = self
            .queue
            .iter_mut()
            .find(|p| p.state() == PacketState::Pending)?;
        packet.begin(at).then_some(packet.id())
    }

    /// Completes the head-of-line packet and removes it from the queue.
    ///
    /// Returns `None` when the head is not in flight.
    pub fn complete_head(&mut self, at: Duration) -> Option<Delivery> {
        let head = self.queue.front_mut()?;
        head.complete(at)?;
        let packet = self.queue.pop_front()?;
        Some(Delivery {
            user: self.id,
            packet: packet.id(),
            start_time: packet.start_time()?,
            end_time: packet.end_time()?,
        })
    }

    /// Returns every in-flight packet to the pending state, returning how many
    /// were deferred.
    pub fn defer_in_flight(&mut self) -> usize {
        self.queue.iter_mut().map(Packet::defer).filter(|d| *d).count()
    }
}
