//! Tracing subscriber setup for the `airtime` binary.
//!
//! Logs go to stderr so the report printed on stdout stays machine readable.
//! `RUST_LOG` directives are honoured on top of the default level, and
//! `AIRTIME_LOG_FORMAT=json` switches to JSON lines.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub(crate) fn init_tracer(level: Option<LevelFilter>) -> anyhow::Result<()> {
    let default_filter = if cfg!(any(test, debug_assertions)) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let default_filter = level.unwrap_or(default_filter);
    let filter_layer = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_filter.into())
        .from_env_lossy();

    if std::env::var("AIRTIME_DISABLE_LOGS").is_ok() {
        return Ok(());
    }
    let use_json = std::env::var("AIRTIME_LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let fmt_layer = if use_json {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_level(true)
            .json()
            .boxed()
    } else if cfg!(debug_assertions) {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter_layer))
        .try_init()?;
    Ok(())
}
