use super::snapshot::{RosterSnapshot, SearchContext};
use super::Replica;
use crate::config::SearchParams;
use crate::error::{PlResult, PlacementError};
use crate::events::{EventSink, PlacementEvent};
use crate::roster::ClassId;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestartSummary {
    pub restart: usize,
    pub seed: u64,
    pub score: f32,
    pub swaps: usize,
    pub iterations: usize,
    pub valid: bool,
}

pub struct OptimizationResult {
    pub best: RestartSummary,
    pub assignment: Vec<Option<ClassId>>,
    pub initial_score: f32,
    pub restarts: Vec<RestartSummary>,
}

struct RestartResult {
    summary: RestartSummary,
    assignment: Vec<Option<ClassId>>,
}

pub struct SwapOptimizer {
    ctx: Arc<SearchContext>,
    params: SearchParams,
}

impl SwapOptimizer {
    pub fn new(ctx: SearchContext, params: SearchParams) -> Self {
        Self {
            ctx: Arc::new(ctx),
            params,
        }
    }

    pub fn context(&self) -> &SearchContext {
        &self.ctx
    }

    /// Runs `max_restarts` independent restarts from `start` and keeps the lowest-scoring
    /// valid one. Restart `i` is seeded with `seed + i`, so the result does not depend on
    /// whether restarts run in parallel.
    pub fn run(&self, start: &RosterSnapshot, sink: &dyn EventSink) -> PlResult<OptimizationResult> {
        let restarts = self.params.max_restarts;
        let initial_score = start.score(&self.ctx);
        info!(
            "Phase 4: {} restarts from score {:.4} (seed {}, parallel {})",
            restarts, initial_score, self.params.seed, self.params.parallel
        );

        let run_one = |restart: usize| -> PlResult<RestartResult> {
            if sink.is_cancelled() {
                return Err(PlacementError::Cancelled);
            }
            let seed = self.params.seed.wrapping_add(restart as u64);
            let mut replica = Replica::new(self.ctx.clone(), start.clone(), &self.params, seed);
            replica.run(sink)?;

            let summary = RestartSummary {
                restart,
                seed,
                score: replica.score,
                swaps: replica.swaps,
                iterations: replica.iterations,
                valid: replica.is_valid(),
            };
            debug!("Restart {} finished: {:?}", restart, summary);
            sink.on_event(&PlacementEvent::RestartFinished {
                restart,
                score: summary.score,
                swaps: summary.swaps,
                valid: summary.valid,
            });
            Ok(RestartResult {
                summary,
                assignment: replica.snapshot.class_of,
            })
        };

        let outcomes: Vec<PlResult<RestartResult>> = if self.params.parallel {
            (0..restarts).into_par_iter().map(run_one).collect()
        } else {
            (0..restarts).map(run_one).collect()
        };
        let mut results = outcomes.into_iter().collect::<PlResult<Vec<_>>>()?;

        let summaries: Vec<RestartSummary> = results.iter().map(|r| r.summary.clone()).collect();
        let Some(best) = select_best(&summaries) else {
            warn!("Phase 4: none of {} restarts is valid", restarts);
            return Err(PlacementError::NoValidRestart { restarts });
        };
        let chosen = results.swap_remove(best);

        info!(
            "Phase 4: kept restart {} with score {:.4} ({} swaps)",
            chosen.summary.restart, chosen.summary.score, chosen.summary.swaps
        );
        Ok(OptimizationResult {
            best: chosen.summary,
            assignment: chosen.assignment,
            initial_score,
            restarts: summaries,
        })
    }
}

/// Index of the lowest-scoring valid restart; ties go to the lower restart number.
/// Invalid restarts are never selected, whatever their score.
pub fn select_best(restarts: &[RestartSummary]) -> Option<usize> {
    restarts
        .iter()
        .enumerate()
        .filter(|(_, r)| r.valid)
        .min_by(|(_, a), (_, b)| a.score.total_cmp(&b.score).then(a.restart.cmp(&b.restart)))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(restart: usize, score: f32, valid: bool) -> RestartSummary {
        RestartSummary {
            restart,
            seed: 42 + restart as u64,
            score,
            swaps: 0,
            iterations: 0,
            valid,
        }
    }

    #[test]
    fn test_select_best_skips_invalid_lowest_score() {
        let restarts = vec![
            summary(0, 3.0, true),
            summary(1, 2.5, true),
            summary(2, 0.1, false),
            summary(3, 2.8, true),
            summary(4, 4.0, true),
        ];
        assert_eq!(select_best(&restarts), Some(1));
    }

    #[test]
    fn test_select_best_ties_by_restart() {
        let restarts = vec![summary(0, 1.0, true), summary(1, 1.0, true)];
        assert_eq!(select_best(&restarts), Some(0));
    }

    #[test]
    fn test_select_best_none_valid() {
        let restarts = vec![summary(0, 1.0, false), summary(1, 0.5, false)];
        assert_eq!(select_best(&restarts), None);
    }
}
