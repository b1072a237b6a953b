//! Deterministic event scheduler for channel simulation.
//!
//! The scheduler processes events in a deterministic order based on:
//! 1. Event timestamp (earlier first)
//! 2. Event type (completions before access attempts at the same instant)
//! 3. User id (lower first)
//! 4. Event ID (for complete tie-breaking)
//!
//! Processing an event moves the owned [`VirtualTime`] forward to the event's
//! timestamp, so the clock always reads the time of the latest completion.

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

use super::time::{as_nanos, VirtualTime};
use crate::station::UserId;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

/// Types of events that can be scheduled.
///
/// The declaration order is significant: at equal timestamps a finishing
/// transmission is handled before anyone senses the medium, so a channel
/// released at `t` is seen as free by an attempt at `t`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventType {
    /// A transmission finishes on the given channel (sub-channel index, or 0
    /// for the shared medium).
    TransmissionComplete { user: UserId, channel: usize },
    /// A user senses the medium and tries to acquire it.
    AccessAttempt { user: UserId },
}

impl EventType {
    /// Returns the user this event belongs to.
    pub fn user(&self) -> UserId {
        match self {
            EventType::TransmissionComplete { user, .. } => *user,
            EventType::AccessAttempt { user } => *user,
        }
    }
}

/// A scheduled event in the simulation.
#[derive(Debug, Clone)]
pub struct Event {
    /// When this event should be processed (virtual nanos)
    pub timestamp: u64,
    /// Unique identifier for ordering ties
    pub id: EventId,
    /// The event type and payload
    pub event_type: EventType,
}

impl Event {
    fn new(timestamp: u64, id: EventId, event_type: EventType) -> Self {
        Self {
            timestamp,
            id,
            event_type,
        }
    }

    /// Returns the event timestamp as a duration since the start of the run.
    pub fn at(&self) -> Duration {
        Duration::from_nanos(self.timestamp)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reverse ordering so the smallest key comes first
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.event_type.cmp(&self.event_type))
            .then_with(|| other.id.0.cmp(&self.id.0))
    }
}

/// Configuration for the scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Whether to log events as they're processed
    pub trace_events: bool,
    /// Whether to keep every processed event for replay verification
    pub keep_event_log: bool,
}

/// Deterministic event scheduler owning the run's virtual clock.
pub struct Scheduler {
    /// Virtual time for the simulation
    time: VirtualTime,
    /// Priority queue of pending events
    pending_events: BinaryHeap<Event>,
    /// Counter for generating unique event IDs
    next_event_id: u64,
    /// Number of events processed so far
    processed: u64,
    /// Log of processed events (only filled when `keep_event_log` is set)
    event_log: Vec<Event>,
    config: SchedulerConfig,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            time: VirtualTime::new(),
            pending_events: BinaryHeap::new(),
            next_event_id: 0,
            processed: 0,
            event_log: Vec::new(),
            config,
        }
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> Duration {
        self.time.now()
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn now_nanos(&self) -> u64 {
        self.time.now_nanos()
    }

    /// Advances the clock by a fixed phase duration without processing events.
    ///
    /// Used for phases that hold the medium for a known time (broadcasts,
    /// control exchanges). Pending events are left untouched.
    pub fn advance(&mut self, duration: Duration) -> Duration {
        self.time.advance(duration);
        self.now()
    }

    /// Returns the number of pending events.
    pub fn pending_count(&self) -> usize {
        self.pending_events.len()
    }

    /// Returns the number of events processed since creation.
    pub fn processed_count(&self) -> u64 {
        self.processed
    }

    /// Returns the event log for replay verification.
    pub fn event_log(&self) -> &[Event] {
        &self.event_log
    }

    /// Schedules an event at the given absolute time.
    pub fn schedule_at(&mut self, at: Duration, event_type: EventType) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;

        let timestamp = as_nanos(at);
        if self.config.trace_events {
            tracing::trace!(timestamp, id = id.0, ?event_type, "Scheduling event");
        }
        self.pending_events.push(Event::new(timestamp, id, event_type));
        id
    }

    /// Schedules an event after the given delay from now.
    pub fn schedule_after(&mut self, delay: Duration, event_type: EventType) -> EventId {
        let at = self.now().saturating_add(delay);
        self.schedule_at(at, event_type)
    }

    /// Returns the time of the next pending event, if any.
    pub fn next_event_time(&self) -> Option<Duration> {
        self.pending_events.peek().map(Event::at)
    }

    /// Processes the next pending event, advancing time if necessary.
    ///
    /// Returns the processed event, or None if no events are pending.
    pub fn step(&mut self) -> Option<Event> {
        let event = self.pending_events.pop()?;
        self.time.advance_to(event.timestamp);
        self.processed += 1;

        if self.config.trace_events {
            tracing::trace!(
                timestamp = event.timestamp,
                id = event.id.0,
                ?event.event_type,
                "Processing event"
            );
        }
        if self.config.keep_event_log {
            self.event_log.push(event.clone());
        }
        Some(event)
    }

    /// Processes every event due at or before `deadline`, then moves the clock
    /// to `deadline`.
    ///
    /// Returns the processed events in processing order. Events later than the
    /// deadline stay pending.
    pub fn drain_until(&mut self, deadline: Duration) -> Vec<Event> {
        let mut processed = Vec::new();
        while let Some(next) = self.next_event_time() {
            if next > deadline {
                break;
            }
            match self.step() {
                Some(event) => processed.push(event),
                None => break,
            }
        }
        self.time.advance_to(as_nanos(deadline));
        processed
    }

    /// Removes all pending events without processing them, in timestamp order.
    pub fn drain_pending(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
            .into_sorted_vec()
            .into_iter()
            .rev()
            .collect()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now_nanos())
            .field("pending_count", &self.pending_count())
            .field("processed", &self.processed)
            .finish()
    }
}
