use crate::roster::{Gender, Student};

/// Per-student values the scorer needs, flattened once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StudentTraits {
    pub female: bool,
    pub male: bool,
    pub scores: [f32; 4],
    pub head: bool,
    pub low: bool,
}

impl StudentTraits {
    pub fn of(student: &Student, head_threshold: f32, low_threshold: f32) -> Self {
        let profile = student.scores.profile();
        Self {
            female: student.gender == Gender::Female,
            male: student.gender == Gender::Male,
            scores: student.scores.as_array(),
            head: profile >= head_threshold,
            low: profile <= low_threshold,
        }
    }
}

/// Running aggregates of one class. Cheap to copy, updated incrementally on every move.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassStats {
    pub size: usize,
    pub female: usize,
    pub male: usize,
    pub sums: [f32; 4],
    pub heads: usize,
    pub lows: usize,
}

impl ClassStats {
    pub fn add(&mut self, t: &StudentTraits) {
        self.size += 1;
        self.female += t.female as usize;
        self.male += t.male as usize;
        for (s, v) in self.sums.iter_mut().zip(t.scores) {
            *s += v;
        }
        self.heads += t.head as usize;
        self.lows += t.low as usize;
    }

    pub fn remove(&mut self, t: &StudentTraits) {
        self.size -= 1;
        self.female -= t.female as usize;
        self.male -= t.male as usize;
        for (s, v) in self.sums.iter_mut().zip(t.scores) {
            *s -= v;
        }
        self.heads -= t.head as usize;
        self.lows -= t.low as usize;
    }

    /// Stats after replacing `out` by `inc`.
    pub fn exchanged(&self, out: &StudentTraits, inc: &StudentTraits) -> Self {
        let mut next = *self;
        next.remove(out);
        next.add(inc);
        next
    }

    pub fn averages(&self) -> [f32; 4] {
        if self.size == 0 {
            return [0.0; 4];
        }
        let n = self.size as f32;
        self.sums.map(|s| s / n)
    }

    pub fn female_ratio(&self) -> f32 {
        if self.size == 0 {
            0.0
        } else {
            self.female as f32 / self.size as f32
        }
    }

    /// |female - male|
    pub fn parity_gap(&self) -> usize {
        self.female.abs_diff(self.male)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traits(female: bool, v: f32) -> StudentTraits {
        StudentTraits {
            female,
            male: !female,
            scores: [v; 4],
            head: v >= 3.25,
            low: v <= 1.75,
        }
    }

    #[test]
    fn test_add_remove_restores_stats() {
        let mut stats = ClassStats::default();
        let a = traits(true, 4.0);
        let b = traits(false, 1.0);
        stats.add(&a);
        let before = stats;
        stats.add(&b);
        assert_eq!(stats.size, 2);
        assert_eq!(stats.parity_gap(), 0);
        assert_eq!(stats.averages(), [2.5; 4]);
        stats.remove(&b);
        assert_eq!(stats, before);
    }

    #[test]
    fn test_exchanged_keeps_size() {
        let mut stats = ClassStats::default();
        stats.add(&traits(true, 3.0));
        stats.add(&traits(true, 3.0));
        let next = stats.exchanged(&traits(true, 3.0), &traits(false, 1.0));
        assert_eq!(next.size, 2);
        assert_eq!(next.female, 1);
        assert_eq!(next.lows, 1);
    }
}
