//! Phase 4: multi-restart swap optimizer.

pub mod moves;
pub mod runner;
pub mod snapshot;

use self::moves::{best_swap, random_cycle, RecentSwaps, EPSILON};
use self::snapshot::{RosterSnapshot, SearchContext};
use crate::config::SearchParams;
use crate::error::{PlResult, PlacementError};
use crate::events::EventSink;
use crate::roster::ClassId;
use std::sync::Arc;
use strum_macros::Display;
use tracing::debug;

/// Life cycle of one restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    Init,
    /// Greedy swaps, with degrading swaps accepted by annealing when enabled.
    Search,
    PostGreedy,
    ThreeWay,
    Done,
}

/// Outcome of a single search iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Improved,
    Degraded,
    Idle,
}

/// One restart: an isolated copy of the assignment plus its own generator.
pub struct Replica {
    pub ctx: Arc<SearchContext>,
    pub params: SearchParams,

    pub snapshot: RosterSnapshot,
    pub score: f32,
    pub best: RosterSnapshot,
    pub best_score: f32,

    pub temperature: f32,
    pub stage: Stage,
    pub swaps: usize,
    pub iterations: usize,

    pub recent: RecentSwaps,
    pub rng: fastrand::Rng,
}

impl Replica {
    pub fn new(ctx: Arc<SearchContext>, start: RosterSnapshot, params: &SearchParams, seed: u64) -> Self {
        let temperature = ctx.scorer.weights.temp_initial;
        Self {
            recent: RecentSwaps::new(params.recent_window),
            best: start.clone(),
            snapshot: start,
            score: 0.0,
            best_score: f32::MAX,
            temperature,
            stage: Stage::Init,
            swaps: 0,
            iterations: 0,
            rng: fastrand::Rng::with_seed(seed),
            params: params.clone(),
            ctx,
        }
    }

    /// Drives the state machine to `Done`.
    pub fn run(&mut self, sink: &dyn EventSink) -> PlResult<()> {
        loop {
            match self.stage {
                Stage::Init => {
                    self.score = self.snapshot.score(&self.ctx);
                    self.best_score = self.score;
                    self.best = self.snapshot.clone();
                    self.stage = Stage::Search;
                }
                Stage::Search => {
                    self.search(sink)?;
                    // Annealing may end below its best state.
                    if self.best_score < self.score {
                        self.snapshot = self.best.clone();
                        self.score = self.best_score;
                    }
                    self.stage = Stage::PostGreedy;
                }
                Stage::PostGreedy => {
                    for _ in 0..self.params.greedy_iterations {
                        if sink.is_cancelled() {
                            return Err(PlacementError::Cancelled);
                        }
                        self.step(false);
                    }
                    self.stage = Stage::ThreeWay;
                }
                Stage::ThreeWay => {
                    for _ in 0..self.params.three_way_attempts {
                        if sink.is_cancelled() {
                            return Err(PlacementError::Cancelled);
                        }
                        if let Some(cycle) = random_cycle(&self.ctx, &self.snapshot, &mut self.rng) {
                            self.snapshot.apply(&self.ctx, &cycle.moves);
                            self.score -= cycle.gain;
                            self.swaps += 1;
                        }
                    }
                    // Drop accumulated float drift.
                    self.score = self.snapshot.score(&self.ctx);
                    self.stage = Stage::Done;
                }
                Stage::Done => return Ok(()),
            }
            debug!("Restart stage -> {} (score {:.4})", self.stage, self.score);
        }
    }

    fn search(&mut self, sink: &dyn EventSink) -> PlResult<()> {
        let anneal = self.ctx.scorer.weights.annealing;
        let mut stale = 0;

        for _ in 0..self.params.max_iterations {
            if sink.is_cancelled() {
                return Err(PlacementError::Cancelled);
            }
            self.iterations += 1;
            self.step(anneal);

            if self.score < self.best_score - EPSILON {
                self.best_score = self.score;
                self.best = self.snapshot.clone();
                stale = 0;
            } else {
                stale += 1;
            }
            if stale >= self.params.patience {
                break;
            }
        }
        Ok(())
    }

    /// Worst class against a partner; apply the best swap if it improves, or if annealing
    /// accepts the degradation.
    pub fn step(&mut self, anneal: bool) -> Step {
        let weights = &self.ctx.scorer.weights;
        let (max_degradation, cooling, temp_min) =
            (weights.max_degradation, weights.cooling_rate, weights.temp_min);

        let outcome = match self.pick_classes() {
            Some((a, b)) => {
                let candidate = best_swap(
                    &self.ctx,
                    &self.snapshot,
                    a,
                    b,
                    &self.recent,
                    self.params.max_candidates,
                    &mut self.rng,
                );
                match candidate {
                    Some(m) if m.gain > EPSILON => {
                        self.commit(m);
                        Step::Improved
                    }
                    Some(m)
                        if anneal
                            && m.gain >= -max_degradation
                            && self.rng.f32() < (m.adjusted / self.temperature).exp() =>
                    {
                        self.commit(m);
                        Step::Degraded
                    }
                    _ => Step::Idle,
                }
            }
            None => Step::Idle,
        };

        if anneal {
            self.temperature = (self.temperature * cooling).max(temp_min);
        }
        outcome
    }

    fn commit(&mut self, m: moves::SwapMove) {
        let moves = m.moves(&self.snapshot);
        self.snapshot.apply(&self.ctx, &moves);
        self.score -= m.gain;
        self.recent.record(m.first);
        self.recent.record(m.second);
        self.swaps += 1;
    }

    /// Worst-scoring class holding a swappable student, and its partner: random with
    /// probability `partner_random_rate`, else the most complementary deviation.
    fn pick_classes(&mut self) -> Option<(ClassId, ClassId)> {
        let ctx = &self.ctx;
        let open: Vec<ClassId> = (0..ctx.num_classes)
            .filter(|&c| self.snapshot.members[c].iter().any(|&m| ctx.swappable[m]))
            .collect();
        if open.len() < 2 {
            return None;
        }

        let scores: Vec<f32> = open
            .iter()
            .map(|&c| ctx.scorer.class_score(c, &self.snapshot.stats[c]))
            .collect();
        let mut worst = 0;
        for i in 1..open.len() {
            if scores[i] > scores[worst] {
                worst = i;
            }
        }
        let a = open[worst];

        let others: Vec<ClassId> = open.iter().copied().filter(|&c| c != a).collect();
        let b = if self.rng.f32() < self.params.partner_random_rate {
            others[self.rng.usize(..others.len())]
        } else {
            let sa = &self.snapshot.stats[a];
            let mut best = others[0];
            let mut best_fit = ctx.scorer.complementarity(sa, &self.snapshot.stats[best]);
            for &c in &others[1..] {
                let fit = ctx.scorer.complementarity(sa, &self.snapshot.stats[c]);
                if fit < best_fit {
                    best = c;
                    best_fit = fit;
                }
            }
            best
        };
        Some((a, b))
    }

    pub fn is_valid(&self) -> bool {
        self.snapshot.is_valid(&self.ctx)
    }
}
