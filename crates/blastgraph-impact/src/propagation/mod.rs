//! Impact propagation: six ordered mark-and-propagate stages over the
//! dependency graph.
//!
//! A seeded run first clears every mark, then starts from the symbol
//! threatened by a vulnerability, so the same seed always produces the same
//! marked set and a failed run can simply be re-run. Within a run stages
//! only ever add marks, so each is monotonic and idempotent. Stage A
//! iterates to a local fixed point.
//! Stages B-F run once each by default; [`PropagationConfig::converge`]
//! re-drives them until a whole round marks nothing.
//!
//! Each sub-pass reads its match set, then commits its marks with a single
//! atomic [`GraphStore::mark_nodes`] call. Marks are never rolled back: a
//! stage failure or an expired deadline leaves earlier marks in place.

mod stages;

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blastgraph_core::{NodeId, NodeKind};
use blastgraph_storage::{GraphStore, StorageError};

use crate::error::ImpactError;
use crate::vulnerability;

/// Propagation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Re-run stages B-F until a full round marks nothing.
    pub converge: bool,
    /// Wall-clock budget for the whole run, in milliseconds.
    pub deadline_ms: Option<u64>,
}

/// The propagation stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AllReachingSymbols,
    AllProvidingLibraries,
    AllReachingComponents,
    AllHostingAssets,
    LateralMovement,
    AllSystems,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::AllReachingSymbols,
        Stage::AllProvidingLibraries,
        Stage::AllReachingComponents,
        Stage::AllHostingAssets,
        Stage::LateralMovement,
        Stage::AllSystems,
    ];

    /// Stages run after the call-graph closure.
    pub const DOWNSTREAM: [Stage; 5] = [
        Stage::AllProvidingLibraries,
        Stage::AllReachingComponents,
        Stage::AllHostingAssets,
        Stage::LateralMovement,
        Stage::AllSystems,
    ];

    pub fn letter(&self) -> char {
        match self {
            Stage::AllReachingSymbols => 'A',
            Stage::AllProvidingLibraries => 'B',
            Stage::AllReachingComponents => 'C',
            Stage::AllHostingAssets => 'D',
            Stage::LateralMovement => 'E',
            Stage::AllSystems => 'F',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::AllReachingSymbols => "all_reaching_symbols",
            Stage::AllProvidingLibraries => "all_providing_libraries",
            Stage::AllReachingComponents => "all_reaching_components",
            Stage::AllHostingAssets => "all_hosting_assets",
            Stage::LateralMovement => "lateral_movement",
            Stage::AllSystems => "all_systems",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.letter(), self.name())
    }
}

/// Identifier of one propagation run, for correlating logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        RunId::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newly-marked count of one stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    /// 1-based round; stage A always runs in round 1.
    pub round: u32,
    pub newly_marked: usize,
}

/// Summary of a propagation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub run_id: RunId,
    /// Seed vulnerability and symbol, when the run was started from one.
    pub vulnerability: Option<NodeId>,
    pub seed: Option<NodeId>,
    pub stages: Vec<StageReport>,
    /// Rounds of stages B-F executed.
    pub rounds: u32,
    /// Marked nodes of every kind once the run finished.
    pub total_marked: usize,
}

impl PropagationReport {
    /// Sum of newly-marked counts reported for `stage` over all rounds.
    pub fn newly_marked_by(&self, stage: Stage) -> usize {
        self.stages
            .iter()
            .filter(|r| r.stage == stage)
            .map(|r| r.newly_marked)
            .sum()
    }
}

/// Absolute point in time after which no further marks are committed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Deadline(None)
    }

    pub fn after(budget: Duration) -> Self {
        Deadline(Some(Instant::now() + budget))
    }

    pub fn from_config(config: &PropagationConfig) -> Self {
        match config.deadline_ms {
            Some(ms) => Deadline::after(Duration::from_millis(ms)),
            None => Deadline::none(),
        }
    }

    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

/// Why a stage stopped early.
#[derive(Debug)]
enum Interrupt {
    Storage(StorageError),
    Deadline,
}

impl From<StorageError> for Interrupt {
    fn from(err: StorageError) -> Self {
        Interrupt::Storage(err)
    }
}

impl Interrupt {
    fn into_error(self, stage: Stage) -> ImpactError {
        match self {
            Interrupt::Storage(error) => ImpactError::StageFailed { stage, error },
            Interrupt::Deadline => ImpactError::DeadlineExceeded { stage },
        }
    }
}

/// Drives propagation stages against an injected store.
pub struct Propagator<'s, S> {
    store: &'s mut S,
    config: PropagationConfig,
}

impl<'s, S: GraphStore> Propagator<'s, S> {
    pub fn new(store: &'s mut S, config: PropagationConfig) -> Self {
        Propagator { store, config }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Clears all marks, seeds from the vulnerability with exactly
    /// `identity`, then runs the full pipeline.
    pub fn run(&mut self, identity: Option<&str>) -> Result<PropagationReport, ImpactError> {
        let seed = vulnerability::seed(&mut *self.store, identity)?;
        let mut report = self.propagate()?;
        report.vulnerability = Some(seed.vulnerability);
        report.seed = Some(seed.symbol);
        Ok(report)
    }

    /// Runs the pipeline from whatever is currently marked.
    ///
    /// Marks are kept, so repeated single-pass calls can keep growing the
    /// marked set until it reaches the converged fixed point.
    pub fn propagate(&mut self) -> Result<PropagationReport, ImpactError> {
        let run_id = RunId::new();
        let deadline = Deadline::from_config(&self.config);
        tracing::info!(run = %run_id, converge = self.config.converge, "propagation started");

        let mut stages = vec![StageReport {
            stage: Stage::AllReachingSymbols,
            round: 1,
            newly_marked: self.execute(Stage::AllReachingSymbols, &deadline, run_id)?,
        }];

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut round_total = 0;
            for stage in Stage::DOWNSTREAM {
                let newly_marked = self.execute(stage, &deadline, run_id)?;
                round_total += newly_marked;
                stages.push(StageReport {
                    stage,
                    round: rounds,
                    newly_marked,
                });
            }
            if !self.config.converge || round_total == 0 {
                break;
            }
            tracing::debug!(run = %run_id, round = rounds, marked = round_total, "re-driving downstream stages");
        }

        let total_marked = count_marked(&*self.store).map_err(ImpactError::Storage)?;
        tracing::info!(run = %run_id, rounds, total_marked, "propagation finished");
        Ok(PropagationReport {
            run_id,
            vulnerability: None,
            seed: None,
            stages,
            rounds,
            total_marked,
        })
    }

    /// Runs a single stage without a deadline and returns its newly-marked
    /// count.
    pub fn run_stage(&mut self, stage: Stage) -> Result<usize, ImpactError> {
        self.execute(stage, &Deadline::none(), RunId::new())
    }

    fn execute(&mut self, stage: Stage, deadline: &Deadline, run_id: RunId) -> Result<usize, ImpactError> {
        let result = match stage {
            Stage::AllReachingSymbols => stages::all_reaching_symbols(&mut *self.store, deadline),
            Stage::AllProvidingLibraries => stages::all_providing_libraries(&mut *self.store, deadline),
            Stage::AllReachingComponents => stages::all_reaching_components(&mut *self.store, deadline),
            Stage::AllHostingAssets => stages::all_hosting_assets(&mut *self.store, deadline),
            Stage::LateralMovement => stages::lateral_movement(&mut *self.store, deadline),
            Stage::AllSystems => stages::all_systems(&mut *self.store, deadline),
        };
        match result {
            Ok(newly_marked) => {
                tracing::info!(run = %run_id, stage = stage.name(), newly_marked, "stage complete");
                Ok(newly_marked)
            }
            Err(interrupt) => {
                let err = interrupt.into_error(stage);
                tracing::warn!(run = %run_id, stage = stage.name(), error = %err, "stage aborted");
                Err(err)
            }
        }
    }
}

/// Marked nodes across every kind.
pub fn count_marked<S: GraphStore>(store: &S) -> Result<usize, StorageError> {
    let mut total = 0;
    for kind in NodeKind::ALL {
        total += store.marked_nodes(kind)?.len();
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_and_names() {
        let letters: String = Stage::ALL.iter().map(Stage::letter).collect();
        assert_eq!(letters, "ABCDEF");
        assert_eq!(Stage::ALL[1..], Stage::DOWNSTREAM);
        assert_eq!(Stage::AllHostingAssets.to_string(), "D (all_hosting_assets)");
    }

    #[test]
    fn config_defaults_to_single_pass_without_deadline() {
        let config: PropagationConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.converge);
        assert_eq!(config.deadline_ms, None);
    }

    #[test]
    fn deadlines() {
        assert!(!Deadline::none().expired());
        assert!(Deadline::after(Duration::ZERO).expired());
        assert!(!Deadline::after(Duration::from_secs(3600)).expired());
    }
}
