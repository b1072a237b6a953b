//! Runs the scenario matrix: every selected discipline against every user
//! count, one fresh population and clock per scenario.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    baseline::{self, BaselineEstimate},
    config::{PolicySelection, SimulationConfig},
    error::SimulationError,
    metrics::{Metrics, MetricsCollector, RunStats, SimulationRun},
    policy::{build_policy, AccessPolicy, PolicyKind},
    simulation::{Scheduler, SchedulerConfig, SimulationRng},
    station::User,
};

/// One cell of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scenario {
    /// Position in the matrix, also used to derive the scenario's seed.
    pub index: usize,
    pub policy: PolicyKind,
    pub users: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub metrics: Metrics,
    pub stats: RunStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BaselineEstimate>,
}

/// A scenario together with its result, successful or not.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub result: Result<ScenarioReport, SimulationError>,
}

pub struct ScenarioDriver {
    config: SimulationConfig,
    selection: PolicySelection,
    baseline: bool,
}

impl ScenarioDriver {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            selection: PolicySelection::All,
            baseline: false,
        }
    }

    pub fn with_selection(mut self, selection: PolicySelection) -> Self {
        self.selection = selection;
        self
    }

    /// Attach the closed-form estimate to contention scenarios.
    pub fn with_baseline(mut self, baseline: bool) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The matrix in report order: contention, scheduled, then partitioned by
    /// sub-channel size, each across every user count.
    pub fn scenarios(&self) -> Vec<Scenario> {
        let users = &self.config.scenarios.user_counts;
        let selected =
            |s: PolicySelection| self.selection == PolicySelection::All || self.selection == s;

        let mut kinds = Vec::new();
        if selected(PolicySelection::Contention) {
            kinds.push(PolicyKind::Contention);
        }
        if selected(PolicySelection::Scheduled) {
            kinds.push(PolicyKind::Scheduled);
        }
        if selected(PolicySelection::Partitioned) {
            kinds.extend(
                self.config
                    .partitioned
                    .sub_channel_sizes_mhz
                    .iter()
                    .map(|&sub_channel_mhz| PolicyKind::Partitioned { sub_channel_mhz }),
            );
        }

        kinds
            .into_iter()
            .cartesian_product(users.iter().copied())
            .enumerate()
            .map(|(index, (policy, users))| Scenario {
                index,
                policy,
                users,
            })
            .collect()
    }

    /// Runs every scenario. A failing scenario is logged and recorded; the
    /// remaining ones still run.
    pub fn run_all(&self, packets_per_user: u32) -> Vec<ScenarioOutcome> {
        self.scenarios()
            .into_iter()
            .map(|scenario| {
                let result = self.run_scenario(&scenario, packets_per_user);
                if let Err(err) = &result {
                    tracing::warn!(
                        policy = %scenario.policy,
                        users = scenario.users,
                        error = %err,
                        "Scenario failed"
                    );
                }
                ScenarioOutcome { scenario, result }
            })
            .collect()
    }

    pub fn run_scenario(
        &self,
        scenario: &Scenario,
        packets_per_user: u32,
    ) -> Result<ScenarioReport, SimulationError> {
        let baseline = match scenario.policy {
            PolicyKind::Contention if self.baseline => {
                baseline::estimate(&self.config.radio, scenario.users)
            }
            _ => None,
        };

        if scenario.users == 0 || packets_per_user == 0 {
            tracing::info!(
                policy = %scenario.policy,
                users = scenario.users,
                packets_per_user,
                "Nothing to transmit, skipping simulation"
            );
            return Ok(ScenarioReport {
                metrics: Metrics::Unavailable,
                stats: RunStats {
                    per_user_delivered: vec![0; scenario.users],
                    ..Default::default()
                },
                baseline,
            });
        }

        let rng = SimulationRng::new(self.config.seed).child_with_index(scenario.index as u64);
        let mut policy = build_policy(scenario.policy, &self.config, rng)?;
        let mut users = User::population(
            scenario.users,
            packets_per_user,
            self.config.radio.packet_size_bytes,
        );
        let mut scheduler = Scheduler::with_config(SchedulerConfig {
            trace_events: tracing::enabled!(tracing::Level::TRACE),
            keep_event_log: false,
        });

        tracing::info!(
            index = scenario.index,
            policy = %scenario.policy,
            users = scenario.users,
            packets_per_user,
            "Starting scenario"
        );
        let run = self.simulate(policy.as_mut(), &mut users, &mut scheduler)?;
        let stats = run.stats();
        let metrics = MetricsCollector::new(self.config.radio.packet_bits()).collect(run);
        tracing::info!(
            policy = %scenario.policy,
            users = scenario.users,
            rounds = stats.rounds,
            elapsed_ms = stats.elapsed_ms,
            "Scenario complete"
        );

        Ok(ScenarioReport {
            metrics,
            stats,
            baseline,
        })
    }

    /// Drives rounds until every queue is empty, enforcing the round bound and
    /// the policy's stall tolerance.
    fn simulate(
        &self,
        policy: &mut dyn AccessPolicy,
        users: &mut [User],
        scheduler: &mut Scheduler,
    ) -> Result<SimulationRun, SimulationError> {
        let expected: u64 = users.iter().map(|u| u.queued() as u64).sum();
        let tolerance = policy.stall_tolerance(users.len());
        let mut run = SimulationRun::new(users.len());
        let mut idle_rounds = 0u64;

        while users.iter().any(User::has_pending) {
            if run.rounds() >= self.config.max_rounds {
                return Err(SimulationError::NonTermination {
                    policy: policy.kind(),
                    rounds: run.rounds(),
                    delivered: run.delivered(),
                    expected,
                });
            }

            let outcome = policy.run_round(users, scheduler)?;
            if outcome.made_progress() {
                idle_rounds = 0;
            } else {
                idle_rounds += 1;
                if idle_rounds > tolerance {
                    return Err(SimulationError::Stalled {
                        policy: policy.kind(),
                        idle_rounds,
                        round: run.rounds() + 1,
                    });
                }
            }
            run.record(outcome);
        }

        run.finish(scheduler.now());
        Ok(run)
    }
}
