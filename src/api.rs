use crate::balancer;
use crate::config::Config;
use crate::dispatch;
use crate::error::{PlResult, PlacementError};
use crate::events::{EventSink, NullSink, Phase, PlacementEvent};
use crate::mobility::{self, Classification};
use crate::optimizer::runner::{RestartSummary, SwapOptimizer};
use crate::optimizer::snapshot::{RosterSnapshot, SearchContext};
use crate::resolver;
use crate::roster::checks::{self, QuotaOverrun};
use crate::roster::{Conflict, Mobility, Roster, SeparationViolation};
use crate::scorer::Scorer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounts {
    pub dispatched: usize,
    pub grouped: usize,
    pub separated: usize,
    pub rebalanced: usize,
    pub completed: usize,
    pub parity_swaps: usize,
    pub optimizer_swaps: usize,
    pub restarts_valid: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OptimizerStatus {
    Applied { score: f32, restart: usize },
    /// Every restart ended invalid; the pre-Phase-4 assignment was kept.
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Rebuilt from the final assignment; empty only when there truly is no violation.
    pub separation_violations: Vec<SeparationViolation>,
    pub conflicts: Vec<Conflict>,
    pub optimizer: OptimizerStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementOutcome {
    pub assignment: BTreeMap<String, String>,
    pub counts: PhaseCounts,
    pub mobility: BTreeMap<String, usize>,
    pub report: ValidationReport,
    pub restarts: Vec<RestartSummary>,
    pub score_before: f32,
    pub score_after: f32,
}

/// What Phase 4 did to the roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizerRun {
    pub status: OptimizerStatus,
    pub swaps: usize,
    pub restarts: Vec<RestartSummary>,
    pub score_before: f32,
    pub score_after: f32,
}

impl OptimizerRun {
    fn unchanged(status: OptimizerStatus, score: f32) -> Self {
        Self {
            status,
            swaps: 0,
            restarts: Vec::new(),
            score_before: score,
            score_after: score,
        }
    }
}

/// Findings on an existing assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssignmentAudit {
    pub separation_violations: Vec<SeparationViolation>,
    pub split_cohorts: Vec<(String, Vec<String>)>,
    pub quota_overruns: Vec<QuotaOverrun>,
    pub unassigned: Vec<String>,
}

impl AssignmentAudit {
    pub fn is_clean(&self) -> bool {
        self.separation_violations.is_empty()
            && self.split_cohorts.is_empty()
            && self.quota_overruns.is_empty()
            && self.unassigned.is_empty()
    }
}

/// Phase-sequential placement pipeline over one exclusively owned roster.
pub struct PlacementEngine {
    config: Config,
    sink: Arc<dyn EventSink>,
}

impl PlacementEngine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs Phases 1 to 4 and writes the final classes onto `roster`.
    ///
    /// Configuration problems abort before Phase 1. Per-student feasibility problems are
    /// reported as conflicts. When no Phase 4 restart is valid the Phase 3 assignment is
    /// kept and the status is `Failed`.
    pub fn run(&self, roster: &mut Roster) -> PlResult<PlacementOutcome> {
        let sink: &dyn EventSink = self.sink.as_ref();
        checks::check_quota_supply(roster)?;

        let mut counts = PhaseCounts::default();
        let mut conflicts = Vec::new();

        let dispatched = dispatch::dispatch(roster, sink);
        counts.dispatched = dispatched.placed;
        conflicts.extend(dispatched.conflicts);

        let classification = mobility::classify(roster, sink);
        conflicts.extend(classification.conflicts.iter().cloned());

        let resolved = resolver::resolve(roster, &classification, sink);
        counts.grouped = resolved.grouped;
        counts.separated = resolved.separated;
        conflicts.extend(resolved.conflicts);

        let balanced = balancer::balance(roster, &classification, &self.config.balance, sink);
        counts.rebalanced = balanced.rebalanced;
        counts.completed = balanced.completed;
        counts.parity_swaps = balanced.parity_swaps;
        conflicts.extend(balanced.conflicts);

        if roster.assigned_count() != roster.students.len() {
            warn!(
                "{} students left unassigned after Phase 3",
                roster.students.len() - roster.assigned_count()
            );
        }

        let phase4 = self.optimize(roster, &classification)?;
        counts.optimizer_swaps = phase4.swaps;
        counts.restarts_valid = phase4.restarts.iter().filter(|r| r.valid).count();

        let report = ValidationReport {
            separation_violations: checks::separation_violations(roster),
            conflicts,
            optimizer: phase4.status,
        };
        info!(
            "Placement done: {} students, {} conflicts, {} separation violations, score {:.4}",
            roster.assigned_count(),
            report.conflicts.len(),
            report.separation_violations.len(),
            phase4.score_after
        );

        Ok(PlacementOutcome {
            assignment: roster.assignment_map(),
            counts,
            mobility: mobility_tally(&classification),
            report,
            restarts: phase4.restarts,
            score_before: phase4.score_before,
            score_after: phase4.score_after,
        })
    }

    fn optimize(&self, roster: &mut Roster, classification: &Classification) -> PlResult<OptimizerRun> {
        let scorer = Scorer::new(roster, self.config.weights.clone(), &self.config.balance);
        let ctx = SearchContext::new(roster, classification, scorer);

        if self.config.search.max_restarts == 0 {
            let before = RosterSnapshot::capture(roster, &ctx).score(&ctx);
            return Ok(OptimizerRun::unchanged(OptimizerStatus::Skipped, before));
        }

        let optimizer = SwapOptimizer::new(ctx, self.config.search.clone());
        self.run_optimizer(roster, &optimizer)
    }

    /// Phase 4 on the current assignment of `roster`. The best valid restart is written
    /// back; when none is valid the roster is left untouched and the status is `Failed`.
    pub fn run_optimizer(&self, roster: &mut Roster, optimizer: &SwapOptimizer) -> PlResult<OptimizerRun> {
        let ctx = optimizer.context();
        let start = RosterSnapshot::capture(roster, ctx);
        let before = start.score(ctx);

        match optimizer.run(&start, self.sink.as_ref()) {
            Ok(result) => {
                roster.restore_assignment(&result.assignment);
                self.sink.on_event(&PlacementEvent::PhaseFinished {
                    phase: Phase::Optimize,
                    count: result.best.swaps,
                });
                let after = RosterSnapshot::capture(roster, ctx).score(ctx);
                Ok(OptimizerRun {
                    status: OptimizerStatus::Applied {
                        score: result.best.score,
                        restart: result.best.restart,
                    },
                    swaps: result.best.swaps,
                    restarts: result.restarts,
                    score_before: before,
                    score_after: after,
                })
            }
            Err(PlacementError::NoValidRestart { restarts }) => {
                warn!("Phase 4 failed over {} restarts; keeping the Phase 3 assignment", restarts);
                Ok(OptimizerRun::unchanged(OptimizerStatus::Failed, before))
            }
            Err(e) => Err(e),
        }
    }
}

fn mobility_tally(classification: &Classification) -> BTreeMap<String, usize> {
    Mobility::iter()
        .map(|m| (m.to_string(), classification.count(m)))
        .collect()
}

/// Rebuilds the separation-violation list of the current assignment from scratch.
pub fn validate_assignment(roster: &Roster) -> Vec<SeparationViolation> {
    checks::separation_violations(roster)
}

/// Separation, grouping, quota and completeness findings for the current assignment.
pub fn audit_assignment(roster: &Roster) -> AssignmentAudit {
    AssignmentAudit {
        separation_violations: checks::separation_violations(roster),
        split_cohorts: checks::split_cohorts(roster),
        quota_overruns: checks::quota_overruns(roster),
        unassigned: roster
            .unassigned()
            .into_iter()
            .map(|i| roster.students[i].id.clone())
            .collect(),
    }
}
