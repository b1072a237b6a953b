//! Closed-form estimate used as a point of comparison for the simulated
//! contention figures.
//!
//! Capacity is split evenly between users and contention adds a delay that
//! grows with the logarithm of the user count. The maximum latency is a fixed
//! multiple of the average standing in for retries.

use serde::Serialize;

use crate::config::RadioConfig;

const CONTENTION_DELAY_MS_PER_LN_USER: f64 = 10.0;
const RETRY_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineEstimate {
    pub users: usize,
    pub throughput_mbps: f64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
}

/// Returns `None` for an empty scenario.
pub fn estimate(radio: &RadioConfig, users: usize) -> Option<BaselineEstimate> {
    if users == 0 {
        return None;
    }
    let per_user_bps = radio.effective_bitrate(radio.bandwidth_mhz) / users as f64;
    let transmission_ms = radio.packet_bits() as f64 / per_user_bps * 1e3;
    let contention_ms = if users > 1 {
        (users as f64).ln() * CONTENTION_DELAY_MS_PER_LN_USER
    } else {
        0.0
    };
    let avg_latency_ms = transmission_ms + contention_ms;
    Some(BaselineEstimate {
        users,
        throughput_mbps: per_user_bps / 1e6,
        avg_latency_ms,
        max_latency_ms: avg_latency_ms * RETRY_FACTOR,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_user_gets_full_capacity() {
        let radio = RadioConfig::default();
        let est = estimate(&radio, 1).unwrap();
        assert!((est.throughput_mbps - 20.0 * 256.0 * 5.0 / 6.0).abs() < 1e-9);
        // No contention term with a single user
        let airtime_ms = radio.airtime(20).as_secs_f64() * 1e3;
        assert!((est.avg_latency_ms - airtime_ms).abs() < 1e-6);
        assert!((est.max_latency_ms - 1.5 * est.avg_latency_ms).abs() < 1e-12);
    }

    #[test]
    fn test_contention_term_grows_logarithmically() {
        let radio = RadioConfig::default();
        let ten = estimate(&radio, 10).unwrap();
        let hundred = estimate(&radio, 100).unwrap();
        assert!((ten.throughput_mbps * 10.0 - hundred.throughput_mbps * 100.0).abs() < 1e-6);
        assert!(hundred.avg_latency_ms > ten.avg_latency_ms);
        assert!(ten.avg_latency_ms > 10f64.ln() * 10.0);
    }

    #[test]
    fn test_no_users_no_estimate() {
        assert!(estimate(&RadioConfig::default(), 0).is_none());
    }
}
