//! Text and JSON renderings of a finished matrix.

use std::fmt::Display;

use serde::Serialize;

use crate::{
    driver::{Scenario, ScenarioOutcome, ScenarioReport},
    policy::PolicyKind,
};

/// Console layout: a header whenever the discipline changes, then one case
/// block per user count.
pub struct TextReport<'a> {
    outcomes: &'a [ScenarioOutcome],
}

impl<'a> TextReport<'a> {
    pub fn new(outcomes: &'a [ScenarioOutcome]) -> Self {
        Self { outcomes }
    }
}

fn section_header(policy: PolicyKind) -> String {
    match policy {
        PolicyKind::Contention => "*** Simulation for Contention-Based Access ***".to_owned(),
        PolicyKind::Scheduled => "*** Simulation for Scheduled Access ***".to_owned(),
        PolicyKind::Partitioned { sub_channel_mhz } => {
            format!("*** Simulation for Sub-Channel Size: {sub_channel_mhz} MHz ***")
        }
    }
}

impl Display for TextReport<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut current = None;
        for outcome in self.outcomes {
            let policy = outcome.scenario.policy;
            if current != Some(policy) {
                writeln!(f, "\n{}", section_header(policy))?;
                current = Some(policy);
            }
            writeln!(f, "\n--- Case: {} Users ---", outcome.scenario.users)?;
            match &outcome.result {
                Ok(report) => {
                    write!(f, "{}", report.metrics)?;
                    if let Some(b) = &report.baseline {
                        writeln!(
                            f,
                            "Baseline: {:.2} Mbps, {:.2} ms average, {:.2} ms maximum",
                            b.throughput_mbps, b.avg_latency_ms, b.max_latency_ms
                        )?;
                    }
                }
                Err(err) => writeln!(f, "Simulation failed: {err}")?,
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    seed: u64,
    packets_per_user: u32,
    scenarios: Vec<OutcomeView<'a>>,
}

#[derive(Serialize)]
struct OutcomeView<'a> {
    scenario: &'a Scenario,
    #[serde(flatten)]
    result: ResultView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum ResultView<'a> {
    Report(&'a ScenarioReport),
    Error(String),
}

pub fn to_json(
    seed: u64,
    packets_per_user: u32,
    outcomes: &[ScenarioOutcome],
) -> serde_json::Result<String> {
    let report = JsonReport {
        seed,
        packets_per_user,
        scenarios: outcomes
            .iter()
            .map(|outcome| OutcomeView {
                scenario: &outcome.scenario,
                result: match &outcome.result {
                    Ok(report) => ResultView::Report(report),
                    Err(err) => ResultView::Error(err.to_string()),
                },
            })
            .collect(),
    };
    serde_json::to_string_pretty(&report)
}
