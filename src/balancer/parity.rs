use super::can_move;
use crate::config::BalanceParams;
use crate::events::{EventSink, Phase, PlacementEvent};
use crate::mobility::Classification;
use crate::roster::{ClassId, Gender, Roster, StudentIdx};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
struct Count {
    female: usize,
    male: usize,
}

impl Count {
    fn gap(&self) -> usize {
        self.female.abs_diff(self.male)
    }

    /// Gender the class holds too many of, if any.
    fn surplus(&self) -> Option<Gender> {
        use std::cmp::Ordering::*;
        match self.female.cmp(&self.male) {
            Greater => Some(Gender::Female),
            Less => Some(Gender::Male),
            Equal => None,
        }
    }
}

fn counts(roster: &Roster) -> Vec<Count> {
    let mut out = vec![Count::default(); roster.num_classes()];
    for s in &roster.students {
        if let Some(c) = s.assigned {
            match s.gender {
                Gender::Female => out[c].female += 1,
                Gender::Male => out[c].male += 1,
                Gender::Unknown => {}
            }
        }
    }
    out
}

/// Swaps students of opposite gender between classes with opposite surpluses until every
/// class is within tolerance, no eligible pair remains, or the pass limit is hit.
/// Returns the number of swaps.
pub fn equalize(
    roster: &mut Roster,
    classification: &Classification,
    params: &BalanceParams,
    sink: &dyn EventSink,
) -> usize {
    let tolerance = params.parity_tolerance as usize;
    let mut swaps = 0;

    for _ in 0..params.max_parity_passes {
        let Some((x, y)) = find_swap(roster, classification, tolerance) else {
            break;
        };
        let (Some(a), Some(b)) = (roster.students[x].assigned, roster.students[y].assigned) else {
            break;
        };
        roster.students[x].assigned = Some(b);
        roster.students[y].assigned = Some(a);
        swaps += 1;

        debug!(
            "Parity swap {} ({}) <-> {} ({})",
            roster.students[x].id, roster.classes[a].name, roster.students[y].id, roster.classes[b].name
        );
        sink.on_event(&PlacementEvent::Swapped {
            phase: Phase::Parity,
            first: roster.students[x].id.clone(),
            second: roster.students[y].id.clone(),
        });
    }

    let remaining = counts(roster).iter().filter(|c| c.gap() > tolerance).count();
    info!(
        "Phase 3: {} parity swaps, {} classes still outside tolerance",
        swaps, remaining
    );
    sink.on_event(&PlacementEvent::PhaseFinished {
        phase: Phase::Parity,
        count: swaps,
    });
    swaps
}

/// Worst class first; its partner is the class with the largest opposite surplus that
/// admits an eligible pair. Among pairs, the closest academic profiles win.
fn find_swap(
    roster: &Roster,
    classification: &Classification,
    tolerance: usize,
) -> Option<(StudentIdx, StudentIdx)> {
    let counts = counts(roster);

    let mut unbalanced: Vec<ClassId> = (0..counts.len()).filter(|&c| counts[c].gap() > tolerance).collect();
    unbalanced.sort_by(|&a, &b| counts[b].gap().cmp(&counts[a].gap()).then(a.cmp(&b)));

    for a in unbalanced {
        let Some(give) = counts[a].surplus() else {
            continue;
        };
        let take = match give {
            Gender::Female => Gender::Male,
            _ => Gender::Female,
        };

        let mut partners: Vec<ClassId> = (0..counts.len())
            .filter(|&b| b != a && counts[b].surplus() == Some(take))
            .collect();
        partners.sort_by(|&p, &q| counts[q].gap().cmp(&counts[p].gap()).then(p.cmp(&q)));

        for b in partners {
            if let Some(pair) = best_pair(roster, classification, a, b, give, take) {
                return Some(pair);
            }
        }
    }
    None
}

fn best_pair(
    roster: &Roster,
    classification: &Classification,
    a: ClassId,
    b: ClassId,
    give: Gender,
    take: Gender,
) -> Option<(StudentIdx, StudentIdx)> {
    let pick = |class: ClassId, gender: Gender| -> Vec<StudentIdx> {
        (0..roster.students.len())
            .filter(|&i| roster.students[i].assigned == Some(class) && roster.students[i].gender == gender)
            .collect()
    };
    let from_a = pick(a, give);
    let from_b = pick(b, take);

    let mut best: Option<(f32, StudentIdx, StudentIdx)> = None;
    for &x in &from_a {
        for &y in &from_b {
            if !can_move(roster, classification, x, b, &[y]) || !can_move(roster, classification, y, a, &[x]) {
                continue;
            }
            let d = (roster.students[x].scores.profile() - roster.students[y].scores.profile()).abs();
            match best {
                Some((bd, _, _)) if bd <= d => {}
                _ => best = Some((d, x, y)),
            }
        }
    }
    best.map(|(_, x, y)| (x, y))
}
