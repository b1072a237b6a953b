use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default seed used when neither the configuration file nor the command
/// line provide one.
pub const DEFAULT_SEED: u64 = 0x00A1_7140;
/// Default bound on simulation rounds before a run counts as non-terminating.
pub const DEFAULT_MAX_ROUNDS: u64 = 1_000_000;

const DEFAULT_BANDWIDTH_MHZ: u32 = 20;
const DEFAULT_MODULATION_ORDER: f64 = 256.0;
const DEFAULT_CODING_RATE: f64 = 5.0 / 6.0;
const DEFAULT_PACKET_SIZE_BYTES: u32 = 1024;

#[derive(clap::Parser, Debug, Clone, Default)]
#[command(name = "airtime", version, about)]
pub struct ConfigArgs {
    /// Packets queued by every user. Asked for interactively when omitted.
    #[arg(long, short = 'p', env = "AIRTIME_PACKETS_PER_USER")]
    pub packets_per_user: Option<String>,

    /// TOML file with simulation parameters.
    #[arg(long, env = "AIRTIME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seed for every random decision of the run.
    #[arg(long, env = "AIRTIME_SEED")]
    pub seed: Option<u64>,

    /// Run only one access discipline.
    #[arg(long, value_enum, default_value_t = PolicySelection::All)]
    pub policy: PolicySelection,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print the closed-form estimate next to every contention scenario.
    #[arg(long)]
    pub baseline: bool,

    /// Upper bound on rounds per scenario.
    #[arg(long, env = "AIRTIME_MAX_ROUNDS")]
    pub max_rounds: Option<u64>,

    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<tracing::level_filters::LevelFilter>,
}

impl ConfigArgs {
    /// Loads the configuration file (if any), applies command line overrides
    /// and validates the result.
    pub fn build(&self) -> Result<SimulationConfig, ConfigError> {
        let mut config = match self.config.as_deref() {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicySelection {
    Contention,
    Scheduled,
    Partitioned,
    #[default]
    All,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Complete set of simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u64,
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub contention: ContentionConfig,
    #[serde(default)]
    pub scheduled: ScheduledConfig,
    #[serde(default)]
    pub partitioned: PartitionedConfig,
    #[serde(default)]
    pub scenarios: ScenarioMatrix,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_rounds: default_max_rounds(),
            radio: RadioConfig::default(),
            contention: ContentionConfig::default(),
            scheduled: ScheduledConfig::default(),
            partitioned: PartitionedConfig::default(),
            scenarios: ScenarioMatrix::default(),
        }
    }
}

impl SimulationConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = ?path, "Reading configuration file");
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Rejects parameter sets that cannot produce a meaningful simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let radio = &self.radio;
        if radio.bandwidth_mhz == 0 {
            return Err(invalid("radio.bandwidth_mhz must be positive"));
        }
        if !(radio.modulation_order.is_finite() && radio.modulation_order > 0.0) {
            return Err(invalid("radio.modulation_order must be positive"));
        }
        if !(radio.coding_rate > 0.0 && radio.coding_rate <= 1.0) {
            return Err(invalid("radio.coding_rate must be in (0, 1]"));
        }
        if radio.packet_size_bytes == 0 {
            return Err(invalid("radio.packet_size_bytes must be positive"));
        }
        if self.max_rounds == 0 {
            return Err(invalid("max_rounds must be positive"));
        }
        if self.contention.max_backoff_ms == 0 {
            return Err(invalid("contention.max_backoff_ms must be at least 1"));
        }
        if !(self.contention.airtime_overhead_factor.is_finite()
            && self.contention.airtime_overhead_factor >= 1.0)
        {
            return Err(invalid("contention.airtime_overhead_factor must be >= 1"));
        }
        if self.scheduled.window_ms == 0 {
            return Err(invalid("scheduled.window_ms must be positive"));
        }
        if self.scheduled.spatial_streams == Some(0) {
            return Err(invalid("scheduled.spatial_streams must be positive when set"));
        }
        if self.scenarios.user_counts.is_empty() {
            return Err(invalid("scenarios.user_counts must not be empty"));
        }
        for &width in &self.partitioned.sub_channel_sizes_mhz {
            if width == 0 || width > radio.bandwidth_mhz {
                return Err(ConfigError::Invalid(format!(
                    "sub-channel size {width} MHz does not fit into {} MHz",
                    radio.bandwidth_mhz
                )));
            }
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_owned())
}

/// Physical-layer parameters shared by every discipline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioConfig {
    /// Total channel bandwidth in MHz.
    pub bandwidth_mhz: u32,
    /// Constellation size (e.g. 256 for 256-QAM).
    pub modulation_order: f64,
    pub coding_rate: f64,
    pub packet_size_bytes: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            bandwidth_mhz: DEFAULT_BANDWIDTH_MHZ,
            modulation_order: DEFAULT_MODULATION_ORDER,
            coding_rate: DEFAULT_CODING_RATE,
            packet_size_bytes: DEFAULT_PACKET_SIZE_BYTES,
        }
    }
}

impl RadioConfig {
    pub fn packet_bits(&self) -> u64 {
        u64::from(self.packet_size_bytes) * 8
    }

    /// Usable bits per second over `bandwidth_mhz` of spectrum.
    pub fn effective_bitrate(&self, bandwidth_mhz: u32) -> f64 {
        f64::from(bandwidth_mhz) * 1e6 * self.modulation_order * self.coding_rate
    }

    /// Time needed to push one packet through `bandwidth_mhz` of spectrum.
    pub fn airtime(&self, bandwidth_mhz: u32) -> Duration {
        let bitrate = self.effective_bitrate(bandwidth_mhz);
        if bitrate <= 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64(self.packet_bits() as f64 / bitrate).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentionConfig {
    /// Upper bound of the uniform backoff draw, in whole milliseconds.
    pub max_backoff_ms: u64,
    /// Fixed protocol delay added to every transmission.
    pub protocol_overhead_ms: u64,
    /// Multiplier applied to the raw airtime (preambles, acknowledgements).
    pub airtime_overhead_factor: f64,
}

impl Default for ContentionConfig {
    fn default() -> Self {
        Self {
            max_backoff_ms: 50,
            protocol_overhead_ms: 1,
            airtime_overhead_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduledConfig {
    pub broadcast_ms: u64,
    /// Duration of one user's channel-state report.
    pub csi_exchange_ms: u64,
    pub window_ms: u64,
    /// Lower bound on a single transmission inside the window.
    pub min_transmission_ms: u64,
    /// Concurrent transmissions the window supports; unlimited when unset.
    pub spatial_streams: Option<usize>,
}

impl Default for ScheduledConfig {
    fn default() -> Self {
        Self {
            broadcast_ms: 2,
            csi_exchange_ms: 1,
            window_ms: 15,
            min_transmission_ms: 1,
            spatial_streams: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartitionedConfig {
    pub sub_channel_sizes_mhz: Vec<u32>,
    /// Lower bound on a single sub-channel transmission.
    pub min_transmission_ms: u64,
}

impl Default for PartitionedConfig {
    fn default() -> Self {
        Self {
            sub_channel_sizes_mhz: vec![2, 4, 10],
            min_transmission_ms: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioMatrix {
    pub user_counts: Vec<usize>,
}

impl Default for ScenarioMatrix {
    fn default() -> Self {
        Self {
            user_counts: vec![1, 10, 100],
        }
    }
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_max_rounds() -> u64 {
    DEFAULT_MAX_ROUNDS
}

/// Installs the global tracing subscriber. Subsequent calls are no-ops.
pub fn set_logger(level: Option<tracing::level_filters::LevelFilter>) {
    #[cfg(feature = "trace")]
    {
        use std::sync::atomic::{AtomicBool, Ordering};

        static LOGGER_SET: AtomicBool = AtomicBool::new(false);
        if LOGGER_SET
            .compare_exchange(false, true, Ordering::Release, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        if let Err(err) = crate::logging::init_tracer(level) {
            eprintln!("failed tracing initialization: {err}");
        }
    }
    #[cfg(not(feature = "trace"))]
    let _ = level;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scenarios.user_counts, vec![1, 10, 100]);
        assert_eq!(config.partitioned.sub_channel_sizes_mhz, vec![2, 4, 10]);
    }

    #[test]
    fn test_effective_bitrate() {
        let radio = RadioConfig::default();
        let expected = 20e6 * 256.0 * 5.0 / 6.0;
        assert!((radio.effective_bitrate(20) - expected).abs() < 1e-3);
        // 8192 bits over ~4.27 Gbit/s is just under 2 microseconds
        let airtime = radio.airtime(20);
        assert!(airtime > Duration::from_nanos(1_900) && airtime < Duration::from_nanos(1_930));
        assert!(radio.airtime(2) > radio.airtime(20));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 7

            [scheduled]
            spatial_streams = 4

            [scenarios]
            user_counts = [2, 3]
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_rounds, DEFAULT_MAX_ROUNDS);
        assert_eq!(config.scheduled.spatial_streams, Some(4));
        assert_eq!(config.scheduled.window_ms, 15);
        assert_eq!(config.scenarios.user_counts, vec![2, 3]);
        assert_eq!(config.radio, RadioConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = SimulationConfig::from_toml_str("[radio]\nbandwith_mhz = 40\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_rejects_degenerate_parameters() {
        let mut config = SimulationConfig::default();
        config.partitioned.sub_channel_sizes_mhz = vec![40];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SimulationConfig::default();
        config.contention.max_backoff_ms = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.radio.coding_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.scenarios.user_counts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let args = ConfigArgs {
            seed: Some(99),
            max_rounds: Some(10),
            ..Default::default()
        };
        let config = args.build().unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.max_rounds, 10);
    }
}
