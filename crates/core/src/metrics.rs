//! Turning a finished run into throughput and latency figures.

use std::{fmt::Display, time::Duration};

use serde::Serialize;

use crate::policy::RoundOutcome;

/// Everything recorded while one policy runs a scenario.
///
/// Built incrementally round by round and consumed once by
/// [`MetricsCollector::collect`].
#[derive(Debug, Clone, Default)]
pub struct SimulationRun {
    latencies: Vec<Duration>,
    per_user_deliveries: Vec<u64>,
    backoffs: Vec<Duration>,
    elapsed: Duration,
    rounds: u64,
    wasted_slots: u64,
    deferred: u64,
}

impl SimulationRun {
    pub fn new(user_count: usize) -> Self {
        Self {
            per_user_deliveries: vec![0; user_count],
            ..Default::default()
        }
    }

    /// Folds one round's outcome into the run.
    pub fn record(&mut self, outcome: RoundOutcome) {
        self.rounds += 1;
        for delivery in &outcome.deliveries {
            self.latencies.push(delivery.latency());
            if let Some(count) = self.per_user_deliveries.get_mut(delivery.user.index()) {
                *count += 1;
            }
        }
        self.backoffs.extend(outcome.backoffs);
        self.wasted_slots += outcome.wasted_slots;
        self.deferred += outcome.deferred;
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn delivered(&self) -> u64 {
        self.latencies.len() as u64
    }

    pub fn per_user_deliveries(&self) -> &[u64] {
        &self.per_user_deliveries
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            rounds: self.rounds,
            delivered: self.delivered(),
            backoffs: self.backoffs.len() as u64,
            wasted_slots: self.wasted_slots,
            deferred: self.deferred,
            elapsed_ms: self.elapsed.as_secs_f64() * 1e3,
            per_user_delivered: self.per_user_deliveries.clone(),
        }
    }
}

/// Counters describing how a run unfolded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub rounds: u64,
    pub delivered: u64,
    pub backoffs: u64,
    pub wasted_slots: u64,
    pub deferred: u64,
    pub elapsed_ms: f64,
    /// Packets delivered per user, indexed by user id.
    pub per_user_delivered: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub delivered: u64,
    pub elapsed_secs: f64,
    pub throughput_bps: f64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
}

impl Measurement {
    pub fn throughput_mbps(&self) -> f64 {
        self.throughput_bps / 1e6
    }
}

/// Result of a scenario: figures, or nothing at all when no packet completed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Metrics {
    Unavailable,
    Measured(Measurement),
}

impl Metrics {
    pub fn measurement(&self) -> Option<&Measurement> {
        match self {
            Metrics::Measured(m) => Some(m),
            Metrics::Unavailable => None,
        }
    }
}

impl Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metrics::Unavailable => writeln!(f, "No packets transmitted. Metrics unavailable."),
            Metrics::Measured(m) => {
                writeln!(f, "Throughput: {:.2} Mbps", m.throughput_mbps())?;
                writeln!(f, "Average Latency: {:.2} ms", m.avg_latency_ms)?;
                writeln!(f, "Maximum Latency: {:.2} ms", m.max_latency_ms)
            }
        }
    }
}

pub struct MetricsCollector {
    packet_bits: u64,
}

impl MetricsCollector {
    pub fn new(packet_bits: u64) -> Self {
        Self { packet_bits }
    }

    pub fn collect(&self, run: SimulationRun) -> Metrics {
        let Some(max) = run.latencies.iter().max().copied() else {
            return Metrics::Unavailable;
        };
        if run.elapsed.is_zero() {
            tracing::warn!(
                delivered = run.latencies.len(),
                "Packets delivered in zero simulated time, no rate to report"
            );
            return Metrics::Unavailable;
        }

        let count = run.latencies.len();
        let total: u128 = run.latencies.iter().map(Duration::as_nanos).sum();
        // Integer mean, so it never rounds above the largest sample
        let mean =
            Duration::from_nanos(u64::try_from(total / count as u128).unwrap_or(u64::MAX));
        let elapsed_secs = run.elapsed.as_secs_f64();
        Metrics::Measured(Measurement {
            delivered: count as u64,
            elapsed_secs,
            throughput_bps: (count as u64 * self.packet_bits) as f64 / elapsed_secs,
            avg_latency_ms: mean.as_secs_f64() * 1e3,
            max_latency_ms: max.as_secs_f64() * 1e3,
        })
    }
}
