use super::snapshot::{Move, RosterSnapshot, SearchContext};
use crate::roster::{ClassId, StudentIdx};
use std::collections::VecDeque;

/// Gains at or below this are treated as zero.
pub const EPSILON: f32 = 1e-6;

/// Sliding window of recently swapped students.
#[derive(Debug, Clone, Default)]
pub struct RecentSwaps {
    window: usize,
    queue: VecDeque<StudentIdx>,
}

impl RecentSwaps {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            queue: VecDeque::with_capacity(window + 2),
        }
    }

    pub fn record(&mut self, si: StudentIdx) {
        if self.window == 0 {
            return;
        }
        self.queue.push_back(si);
        while self.queue.len() > self.window {
            self.queue.pop_front();
        }
    }

    pub fn count(&self, si: StudentIdx) -> usize {
        self.queue.iter().filter(|&&s| s == si).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapMove {
    pub first: StudentIdx,
    pub second: StudentIdx,
    /// Raw score decrease.
    pub gain: f32,
    /// Gain minus the anti-oscillation penalty; used for ranking and annealing.
    pub adjusted: f32,
}

impl SwapMove {
    pub fn moves(&self, snap: &RosterSnapshot) -> [Move; 2] {
        let a = snap.class_of[self.first].unwrap_or_default();
        let b = snap.class_of[self.second].unwrap_or_default();
        [(self.first, b), (self.second, a)]
    }
}

/// Best admissible exchange between classes `a` and `b`.
///
/// Every pair is examined when there are at most `max_candidates`; otherwise that many
/// pairs are sampled.
pub fn best_swap(
    ctx: &SearchContext,
    snap: &RosterSnapshot,
    a: ClassId,
    b: ClassId,
    recent: &RecentSwaps,
    max_candidates: usize,
    rng: &mut fastrand::Rng,
) -> Option<SwapMove> {
    let left = snap.swappable_members(ctx, a);
    let right = snap.swappable_members(ctx, b);
    if left.is_empty() || right.is_empty() {
        return None;
    }

    let pairs: Vec<(StudentIdx, StudentIdx)> = if left.len() * right.len() <= max_candidates {
        left.iter()
            .flat_map(|&x| right.iter().map(move |&y| (x, y)))
            .collect()
    } else {
        (0..max_candidates)
            .map(|_| (left[rng.usize(..left.len())], right[rng.usize(..right.len())]))
            .collect()
    };

    let penalty = ctx.scorer.weights.penalty_oscillation;
    let mut best: Option<SwapMove> = None;
    for (x, y) in pairs {
        let moves = [(x, b), (y, a)];
        if !snap.admits(ctx, &moves) {
            continue;
        }
        let gain = snap.gain(ctx, &moves);
        let adjusted = gain - penalty * (recent.count(x) + recent.count(y)) as f32;
        match best {
            Some(m) if m.adjusted >= adjusted => {}
            _ => {
                best = Some(SwapMove {
                    first: x,
                    second: y,
                    gain,
                    adjusted,
                })
            }
        }
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleMove {
    pub moves: [Move; 3],
    pub gain: f32,
}

/// One random 3-way cycle between three distinct classes.
///
/// Both orientations (A->B->C->A and A->C->B->A) are validated; the better admissible
/// one is returned when it improves the score.
pub fn random_cycle(ctx: &SearchContext, snap: &RosterSnapshot, rng: &mut fastrand::Rng) -> Option<CycleMove> {
    let open: Vec<ClassId> = (0..ctx.num_classes)
        .filter(|&c| snap.members[c].iter().any(|&m| ctx.swappable[m]))
        .collect();
    if open.len() < 3 {
        return None;
    }

    let mut picked: Vec<ClassId> = Vec::with_capacity(3);
    while picked.len() < 3 {
        let c = open[rng.usize(..open.len())];
        if !picked.contains(&c) {
            picked.push(c);
        }
    }
    let (a, b, c) = (picked[0], picked[1], picked[2]);

    let pick = |class: ClassId, rng: &mut fastrand::Rng| {
        let pool = snap.swappable_members(ctx, class);
        pool[rng.usize(..pool.len())]
    };
    let x = pick(a, rng);
    let y = pick(b, rng);
    let z = pick(c, rng);

    let forward = [(x, b), (y, c), (z, a)];
    let backward = [(x, c), (y, a), (z, b)];

    [forward, backward]
        .into_iter()
        .filter(|m| snap.admits(ctx, m))
        .map(|m| CycleMove {
            gain: snap.gain(ctx, &m),
            moves: m,
        })
        .filter(|m| m.gain > EPSILON)
        .max_by(|p, q| p.gain.total_cmp(&q.gain))
}
