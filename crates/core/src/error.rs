use std::path::PathBuf;

use thiserror::Error;

use crate::{channel::ChannelError, policy::PolicyKind, station::UserId};

/// Failures that end a single simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("{policy} did not finish within {rounds} rounds ({delivered}/{expected} packets delivered)")]
    NonTermination {
        policy: PolicyKind,
        rounds: u64,
        delivered: u64,
        expected: u64,
    },

    #[error("{policy} made no progress for {idle_rounds} consecutive rounds (round {round})")]
    Stalled {
        policy: PolicyKind,
        idle_rounds: u64,
        round: u64,
    },

    #[error("channel conflict: {0}")]
    ChannelConflict(#[from] ChannelError),

    #[error("queue invariant violated for {user}: {detail}")]
    QueueInvariant { user: UserId, detail: &'static str },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Rejected answers to the packets-per-user prompt.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no packet count given")]
    Empty,

    #[error("packet count must be a whole number, got {0:?}")]
    NotANumber(String),

    #[error("packet count cannot be negative, got {0}")]
    Negative(String),

    #[error("packet count {0} is too large")]
    TooLarge(String),

    #[error("failed reading input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
