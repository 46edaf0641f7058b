//! Phase 3: capacity balancing, completion of the unplaced pool, and gender parity.

pub mod completion;
pub mod parity;

use crate::config::BalanceParams;
use crate::events::{assign_student, EventSink, Phase, PlacementEvent};
use crate::mobility::Classification;
use crate::roster::{ClassId, Conflict, Roster, StudentIdx};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct BalanceReport {
    pub rebalanced: usize,
    pub completed: usize,
    pub parity_swaps: usize,
    pub conflicts: Vec<Conflict>,
}

/// Runs rebalancing, completion and the parity loop in that order.
pub fn balance(
    roster: &mut Roster,
    classification: &Classification,
    params: &BalanceParams,
    sink: &dyn EventSink,
) -> BalanceReport {
    let mut report = BalanceReport {
        rebalanced: rebalance(roster, classification, sink),
        ..Default::default()
    };

    let done = completion::complete(roster, classification, params, sink);
    report.completed = done.placed;
    report.conflicts.extend(done.conflicts);

    report.parity_swaps = parity::equalize(roster, classification, params, sink);
    report
}

/// May `si` leave its class for `to` during Phase 3?
pub(crate) fn can_move(
    roster: &Roster,
    classification: &Classification,
    si: StudentIdx,
    to: ClassId,
    except: &[StudentIdx],
) -> bool {
    classification.is_movable(si)
        && !roster.in_cohort(si)
        && classification.allows(roster, si, to)
        && roster.separation_safe(to, si, except)
}

/// Moves single students from the most over-target class to the most under-target class
/// until no move is possible. Returns the number of moves.
pub fn rebalance(roster: &mut Roster, classification: &Classification, sink: &dyn EventSink) -> usize {
    let mut moves = 0;

    while let Some((si, to)) = next_rebalance_move(roster, classification) {
        assign_student(roster, si, to, Phase::Rebalance, sink);
        moves += 1;
    }

    info!("Phase 3: rebalanced {} students", moves);
    sink.on_event(&PlacementEvent::PhaseFinished {
        phase: Phase::Rebalance,
        count: moves,
    });
    moves
}

fn next_rebalance_move(roster: &Roster, classification: &Classification) -> Option<(StudentIdx, ClassId)> {
    let sizes = roster.class_sizes();
    let excess = |c: ClassId| sizes[c] as i64 - roster.classes[c].target_size as i64;

    let mut over: Vec<ClassId> = (0..roster.num_classes()).filter(|&c| excess(c) > 0).collect();
    let mut under: Vec<ClassId> = (0..roster.num_classes())
        .filter(|&c| excess(c) < 0 && sizes[c] < roster.classes[c].capacity)
        .collect();
    over.sort_by(|&a, &b| excess(b).cmp(&excess(a)).then(a.cmp(&b)));
    under.sort_by(|&a, &b| excess(a).cmp(&excess(b)).then(a.cmp(&b)));

    for &from in &over {
        for &to in &under {
            let candidate = (0..roster.students.len()).find(|&si| {
                roster.students[si].assigned == Some(from) && can_move(roster, classification, si, to, &[])
            });
            if let Some(si) = candidate {
                return Some((si, to));
            }
        }
    }
    None
}
