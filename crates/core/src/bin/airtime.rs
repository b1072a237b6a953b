use std::io::{self, Write};

use airtime::{
    config::{set_logger, ConfigArgs, OutputFormat},
    input::{parse_packets_per_user, read_packets_per_user},
    report::{to_json, TextReport},
    ScenarioDriver,
};
use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let args = ConfigArgs::parse();
    set_logger(args.log_level);

    let config = args.build().context("loading simulation configuration")?;
    let packets_per_user = match args.packets_per_user.as_deref() {
        Some(raw) => parse_packets_per_user(raw),
        None => read_packets_per_user(io::stdin().lock(), io::stdout()),
    }
    .context("reading packets per user")?;

    let seed = config.seed;
    let driver = ScenarioDriver::new(config)
        .with_selection(args.policy)
        .with_baseline(args.baseline);
    let outcomes = driver.run_all(packets_per_user);

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        tracing::warn!(failed, total = outcomes.len(), "Some scenarios did not complete");
    }

    let mut stdout = io::stdout().lock();
    match args.format {
        OutputFormat::Text => write!(stdout, "{}", TextReport::new(&outcomes))?,
        OutputFormat::Json => writeln!(
            stdout,
            "{}",
            to_json(seed, packets_per_user, &outcomes).context("serializing report")?
        )?,
    }
    stdout.flush()?;
    Ok(())
}
