//! Matrix-level properties: reproducibility, configuration layering and
//! report output.

use std::io::Write;

use airtime::{
    config::{ConfigArgs, OutputFormat, PolicySelection},
    report::{to_json, TextReport},
    ConfigError, ScenarioDriver, ScenarioOutcome, SimulationConfig,
};
use clap::Parser;
use testresult::TestResult;

fn summary(outcomes: &[ScenarioOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(report) => format!("{:?} {:?}", report.metrics, report.stats),
            Err(err) => err.to_string(),
        })
        .collect()
}

#[test_log::test]
fn same_seed_same_figures() {
    let run = |seed| {
        let mut config = SimulationConfig::default();
        config.seed = seed;
        summary(&ScenarioDriver::new(config).run_all(4))
    };
    assert_eq!(run(17), run(17));
}

#[test_log::test]
fn seed_changes_contention_backoffs() {
    let backoffs = |seed| {
        let mut config = SimulationConfig::default();
        config.seed = seed;
        ScenarioDriver::new(config)
            .with_selection(PolicySelection::Contention)
            .run_all(4)
            .into_iter()
            .map(|o| o.result.map(|r| r.stats.elapsed_ms).unwrap_or_default())
            .collect::<Vec<_>>()
    };
    assert_ne!(backoffs(1), backoffs(2));
}

#[test_log::test]
fn config_file_and_flags_layer() -> TestResult {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        r#"
seed = 5
max_rounds = 500

[partitioned]
sub_channel_sizes_mhz = [4]

[scenarios]
user_counts = [3, 7]
"#
    )?;

    let path = file.path().to_str().expect("utf-8 temp path");
    let args = ConfigArgs::try_parse_from([
        "airtime",
        "--config",
        path,
        "--seed",
        "9",
        "--policy",
        "partitioned",
        "--format",
        "json",
        "-p",
        "2",
    ])?;
    assert_eq!(args.format, OutputFormat::Json);
    assert_eq!(args.packets_per_user.as_deref(), Some("2"));

    let config = args.build()?;
    assert_eq!(config.seed, 9);
    assert_eq!(config.max_rounds, 500);

    let outcomes = ScenarioDriver::new(config)
        .with_selection(args.policy)
        .run_all(2);
    assert_eq!(outcomes.len(), 2);
    let users: Vec<_> = outcomes.iter().map(|o| o.scenario.users).collect();
    assert_eq!(users, vec![3, 7]);
    Ok(())
}

#[test_log::test]
fn missing_or_invalid_config_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let args = ConfigArgs {
        config: Some(dir.path().join("absent.toml")),
        ..Default::default()
    };
    assert!(matches!(args.build(), Err(ConfigError::Read { .. })));

    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "[partitioned]\nsub_channel_sizes_mhz = [25]")?;
    let args = ConfigArgs {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    assert!(matches!(args.build(), Err(ConfigError::Invalid(_))));
    Ok(())
}

#[test_log::test]
fn reports_render_every_scenario() -> TestResult {
    let config = SimulationConfig::default();
    let seed = config.seed;
    let outcomes = ScenarioDriver::new(config).with_baseline(true).run_all(1);

    let text = TextReport::new(&outcomes).to_string();
    assert_eq!(text.matches("--- Case: ").count(), 15);
    assert_eq!(text.matches("Baseline: ").count(), 3);
    for size in [2, 4, 10] {
        assert!(text.contains(&format!("*** Simulation for Sub-Channel Size: {size} MHz ***")));
    }

    let json: serde_json::Value = serde_json::from_str(&to_json(seed, 1, &outcomes)?)?;
    let scenarios = json["scenarios"].as_array().expect("scenarios array");
    assert_eq!(scenarios.len(), 15);
    assert_eq!(scenarios[0]["scenario"]["policy"]["discipline"], "contention");
    assert!(scenarios[0]["report"]["baseline"].is_object());
    assert_eq!(scenarios[3]["report"]["metrics"]["status"], "measured");
    Ok(())
}
