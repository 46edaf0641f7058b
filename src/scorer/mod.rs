pub mod stats;
pub mod types;

pub use self::stats::{ClassStats, StudentTraits};
pub use self::types::ScoreDetails;
use crate::config::{BalanceParams, ScoringWeights};
use crate::roster::{ClassId, Roster};
use crate::roster::checks::split_cohorts;

/// Weighted class scoring shared by the optimizer and the reports.
///
/// A class scores the weighted sum of its parity deviation, academic-distribution deviation,
/// head/low-performer count deviation and a constant penalty for split grouping cohorts it
/// holds. The roster score is the sum over classes; lower is better.
#[derive(Debug, Clone)]
pub struct Scorer {
    pub weights: ScoringWeights,
    pub traits: Vec<StudentTraits>,

    // Whole-population targets
    pub global_female_ratio: f32,
    pub global_avg: [f32; 4],
    pub head_ratio: f32,
    pub low_ratio: f32,

    pub group_penalty: Vec<f32>,
}

impl Scorer {
    pub fn new(roster: &Roster, weights: ScoringWeights, balance: &BalanceParams) -> Self {
        let traits: Vec<StudentTraits> = roster
            .students
            .iter()
            .map(|s| StudentTraits::of(s, balance.head_threshold, balance.low_threshold))
            .collect();

        let mut all = ClassStats::default();
        for t in &traits {
            all.add(t);
        }
        let n = all.size.max(1) as f32;

        let mut group_penalty = vec![0.0; roster.num_classes()];
        for (_, classes) in split_cohorts(roster) {
            for name in classes {
                if let Some(c) = roster.class_by_name(&name) {
                    group_penalty[c] += weights.weight_grouping;
                }
            }
        }

        Self {
            global_female_ratio: all.female_ratio(),
            global_avg: all.averages(),
            head_ratio: all.heads as f32 / n,
            low_ratio: all.lows as f32 / n,
            weights,
            traits,
            group_penalty,
        }
    }

    /// Aggregates of every class under the roster's current assignment.
    pub fn class_stats(&self, roster: &Roster) -> Vec<ClassStats> {
        let mut stats = vec![ClassStats::default(); roster.num_classes()];
        for (si, s) in roster.students.iter().enumerate() {
            if let Some(c) = s.assigned {
                stats[c].add(&self.traits[si]);
            }
        }
        stats
    }

    pub fn details(&self, class: ClassId, stats: &ClassStats) -> ScoreDetails {
        let grouping = self.group_penalty[class];
        let mut d = ScoreDetails {
            grouping,
            size: stats.size,
            female: stats.female,
            male: stats.male,
            heads: stats.heads,
            lows: stats.lows,
            averages: stats.averages(),
            ..Default::default()
        };
        if stats.size == 0 {
            d.total = grouping;
            return d;
        }

        let size = stats.size as f32;
        let w = &self.weights;

        d.parity = w.weight_parity * (stats.female_ratio() - self.global_female_ratio).abs();
        d.academic = w.weight_academic
            * d.averages
                .iter()
                .zip(self.global_avg)
                .map(|(a, g)| (a - g).abs())
                .sum::<f32>()
            / 4.0;
        let head_dev = (stats.heads as f32 - self.head_ratio * size).abs();
        let low_dev = (stats.lows as f32 - self.low_ratio * size).abs();
        d.profile = w.weight_profile * (head_dev + low_dev) / size;

        d.total = d.parity + d.academic + d.profile + d.grouping;
        d
    }

    #[inline]
    pub fn class_score(&self, class: ClassId, stats: &ClassStats) -> f32 {
        self.details(class, stats).total
    }

    pub fn total(&self, stats: &[ClassStats]) -> f32 {
        stats
            .iter()
            .enumerate()
            .map(|(c, s)| self.class_score(c, s))
            .sum()
    }

    pub fn score_roster(&self, roster: &Roster) -> f32 {
        self.total(&self.class_stats(roster))
    }

    /// Signed deviation of a class from the population: female ratio, academic mean,
    /// head share, low share.
    pub fn deviation(&self, stats: &ClassStats) -> [f32; 4] {
        if stats.size == 0 {
            return [0.0; 4];
        }
        let size = stats.size as f32;
        let academic = stats
            .averages()
            .iter()
            .zip(self.global_avg)
            .map(|(a, g)| a - g)
            .sum::<f32>()
            / 4.0;
        [
            stats.female_ratio() - self.global_female_ratio,
            academic,
            stats.heads as f32 / size - self.head_ratio,
            stats.lows as f32 / size - self.low_ratio,
        ]
    }

    /// Negative when the two classes deviate in opposite directions.
    pub fn complementarity(&self, a: &ClassStats, b: &ClassStats) -> f32 {
        let da = self.deviation(a);
        let db = self.deviation(b);
        da.iter().zip(db).map(|(x, y)| x * y).sum()
    }
}
