use crate::mobility::Classification;
use crate::roster::{ClassId, Roster, StudentIdx};
use crate::scorer::{ClassStats, Scorer};
use std::collections::{BTreeMap, BTreeSet};

/// One proposed relocation: student, destination class.
pub type Move = (StudentIdx, ClassId);

/// Read-only data shared by every restart.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub scorer: Scorer,
    pub num_classes: usize,
    /// Movable and outside any grouping cohort.
    pub swappable: Vec<bool>,
    /// `allowed[student][class]` under the student's mobility label.
    pub allowed: Vec<Vec<bool>>,
    /// Separation code, interned.
    pub separation: Vec<Option<usize>>,
    /// Violations accepted before the search started (FIXED carriers).
    pub baseline: BTreeSet<(ClassId, usize)>,
}

impl SearchContext {
    pub fn new(roster: &Roster, classification: &Classification, scorer: Scorer) -> Self {
        let n = roster.students.len();
        let num_classes = roster.num_classes();

        let swappable = (0..n)
            .map(|si| {
                roster.students[si].assigned.is_some()
                    && classification.is_movable(si)
                    && !roster.in_cohort(si)
            })
            .collect();
        let allowed = (0..n)
            .map(|si| {
                (0..num_classes)
                    .map(|c| classification.allows(roster, si, c))
                    .collect()
            })
            .collect();

        let codes: BTreeMap<String, usize> = roster
            .separation_cohorts()
            .into_keys()
            .enumerate()
            .map(|(i, code)| (code, i))
            .collect();
        let separation = roster
            .students
            .iter()
            .map(|s| s.separation_code.as_ref().and_then(|c| codes.get(c).copied()))
            .collect();

        let mut ctx = Self {
            scorer,
            num_classes,
            swappable,
            allowed,
            separation,
            baseline: BTreeSet::new(),
        };
        ctx.baseline = RosterSnapshot::capture(roster, &ctx).violations(&ctx);
        ctx
    }
}

/// Cheaply cloned view of "which class each student is in", with per-class aggregates.
/// Moves are scored on copies of the touched stats and committed only when accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterSnapshot {
    pub class_of: Vec<Option<ClassId>>,
    pub members: Vec<Vec<StudentIdx>>,
    pub stats: Vec<ClassStats>,
}

impl RosterSnapshot {
    pub fn capture(roster: &Roster, ctx: &SearchContext) -> Self {
        let mut members = vec![Vec::new(); ctx.num_classes];
        let mut stats = vec![ClassStats::default(); ctx.num_classes];
        let class_of: Vec<Option<ClassId>> = roster.assignment();
        for (si, c) in class_of.iter().enumerate() {
            if let Some(c) = *c {
                members[c].push(si);
                stats[c].add(&ctx.scorer.traits[si]);
            }
        }
        Self {
            class_of,
            members,
            stats,
        }
    }

    pub fn score(&self, ctx: &SearchContext) -> f32 {
        ctx.scorer.total(&self.stats)
    }

    /// Score decrease obtained by applying `moves`. Positive is an improvement.
    pub fn gain(&self, ctx: &SearchContext, moves: &[Move]) -> f32 {
        let mut touched: Vec<ClassId> = Vec::with_capacity(3);
        for &(si, to) in moves {
            for c in [self.class_of[si], Some(to)].into_iter().flatten() {
                if !touched.contains(&c) {
                    touched.push(c);
                }
            }
        }

        let before: f32 = touched
            .iter()
            .map(|&c| ctx.scorer.class_score(c, &self.stats[c]))
            .sum();

        let mut after: Vec<ClassStats> = touched.iter().map(|&c| self.stats[c]).collect();
        let slot = |c: ClassId| touched.iter().position(|&t| t == c).unwrap_or(0);
        for &(si, to) in moves {
            let t = &ctx.scorer.traits[si];
            if let Some(from) = self.class_of[si] {
                after[slot(from)].remove(t);
            }
            after[slot(to)].add(t);
        }

        let after: f32 = touched
            .iter()
            .zip(&after)
            .map(|(&c, s)| ctx.scorer.class_score(c, s))
            .sum();
        before - after
    }

    /// True when no moved student ends beside another carrier of its separation code.
    pub fn separation_safe(&self, ctx: &SearchContext, moves: &[Move]) -> bool {
        moves.iter().all(|&(si, to)| {
            let Some(code) = ctx.separation[si] else {
                return true;
            };
            let stays = self.members[to]
                .iter()
                .filter(|m| !moves.iter().any(|(x, _)| x == *m));
            let arrives = moves
                .iter()
                .filter(|(x, t)| *t == to && *x != si)
                .map(|(x, _)| x);
            !stays.chain(arrives).any(|&m| ctx.separation[m] == Some(code))
        })
    }

    /// Mobility and separation check for a whole move set.
    pub fn admits(&self, ctx: &SearchContext, moves: &[Move]) -> bool {
        moves
            .iter()
            .all(|&(si, to)| ctx.swappable[si] && self.class_of[si] != Some(to) && ctx.allowed[si][to])
            && self.separation_safe(ctx, moves)
    }

    pub fn apply(&mut self, ctx: &SearchContext, moves: &[Move]) {
        for &(si, to) in moves {
            let t = &ctx.scorer.traits[si];
            if let Some(from) = self.class_of[si] {
                if let Some(pos) = self.members[from].iter().position(|&m| m == si) {
                    self.members[from].swap_remove(pos);
                }
                self.stats[from].remove(t);
            }
            self.members[to].push(si);
            self.stats[to].add(t);
            self.class_of[si] = Some(to);
        }
    }

    /// Every (class, code) pair held by two or more students.
    pub fn violations(&self, ctx: &SearchContext) -> BTreeSet<(ClassId, usize)> {
        let mut out = BTreeSet::new();
        for (c, members) in self.members.iter().enumerate() {
            let mut seen = BTreeSet::new();
            for &m in members {
                if let Some(code) = ctx.separation[m] {
                    if !seen.insert(code) {
                        out.insert((c, code));
                    }
                }
            }
        }
        out
    }

    /// No separation violation beyond those accepted before the search.
    pub fn is_valid(&self, ctx: &SearchContext) -> bool {
        self.violations(ctx).is_subset(&ctx.baseline)
    }

    pub fn swappable_members(&self, ctx: &SearchContext, class: ClassId) -> Vec<StudentIdx> {
        self.members[class]
            .iter()
            .copied()
            .filter(|&m| ctx.swappable[m])
            .collect()
    }
}
