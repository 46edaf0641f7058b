use crate::config::BalanceParams;
use crate::events::{assign_student, report_conflict, EventSink, Phase, PlacementEvent};
use crate::mobility::Classification;
use crate::roster::{ClassId, Conflict, ConflictKind, Gender, Mobility, Roster, StudentIdx, SCORE_MIDPOINT};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct CompletionReport {
    pub placed: usize,
    pub conflicts: Vec<Conflict>,
}

/// Running totals used to score insertions without rescanning the roster.
struct Load {
    size: usize,
    female: usize,
    profile_sum: f32,
}

/// Places every still-unassigned student.
///
/// Extreme profiles go first. Each candidate class scores
/// `w_cap * free_fraction - w_acad * |avg' - global| - w_par * |female' - global|`
/// where primes denote the class after insertion.
pub fn complete(
    roster: &mut Roster,
    classification: &Classification,
    params: &BalanceParams,
    sink: &dyn EventSink,
) -> CompletionReport {
    let mut report = CompletionReport::default();

    let n = roster.students.len() as f32;
    let global_profile = roster.students.iter().map(|s| s.scores.profile()).sum::<f32>() / n;
    let global_female =
        roster.students.iter().filter(|s| s.gender == Gender::Female).count() as f32 / n;

    let mut loads: Vec<Load> = (0..roster.num_classes())
        .map(|_| Load {
            size: 0,
            female: 0,
            profile_sum: 0.0,
        })
        .collect();
    for s in &roster.students {
        if let Some(c) = s.assigned {
            loads[c].size += 1;
            loads[c].female += (s.gender == Gender::Female) as usize;
            loads[c].profile_sum += s.scores.profile();
        }
    }

    let mut pending = roster.unassigned();
    pending.sort_by(|&a, &b| {
        let da = (roster.students[a].scores.profile() - SCORE_MIDPOINT).abs();
        let db = (roster.students[b].scores.profile() - SCORE_MIDPOINT).abs();
        db.total_cmp(&da).then(a.cmp(&b))
    });

    for si in pending {
        // A cohort peer placed earlier in this loop pins the target.
        if roster.students[si].assigned.is_some() {
            continue;
        }
        let profile = roster.students[si].scores.profile();
        let female = roster.students[si].gender == Gender::Female;

        let score = |c: ClassId, l: &Load| {
            let target = roster.classes[c].target_size as f32;
            let size = (l.size + 1) as f32;
            let free = (target - l.size as f32) / target;
            let avg = (l.profile_sum + profile) / size;
            let ratio = (l.female + female as usize) as f32 / size;
            params.weight_capacity * free
                - params.weight_completion_academic * (avg - global_profile).abs()
                - params.weight_completion_parity * (ratio - global_female).abs()
        };

        let chosen = match cohort_class(roster, si) {
            Some(c) if eligible(roster, classification, si, c) => Some(c),
            _ => (0..roster.num_classes())
                .filter(|&c| eligible(roster, classification, si, c))
                .map(|c| (c, score(c, &loads[c])))
                .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(c, _)| c),
        };

        let class = match chosen {
            Some(c) => c,
            None => force_place(roster, classification, si, sink, &mut report.conflicts),
        };

        assign_student(roster, si, class, Phase::Completion, sink);
        loads[class].size += 1;
        loads[class].female += female as usize;
        loads[class].profile_sum += profile;
        report.placed += 1;
    }

    info!("Phase 3: completed {} students", report.placed);
    sink.on_event(&PlacementEvent::PhaseFinished {
        phase: Phase::Completion,
        count: report.placed,
    });
    report
}

fn eligible(roster: &Roster, classification: &Classification, si: StudentIdx, c: ClassId) -> bool {
    let admissible = match classification.label(si) {
        Mobility::Fixed | Mobility::SwappablePair => classification.allows(roster, si, c),
        _ => roster.accepts(c, si),
    };
    admissible
        && roster.separation_safe(c, si, &[])
        && roster.members(c).len() < roster.classes[c].capacity
}

/// Class already holding a placed member of the student's grouping cohort.
fn cohort_class(roster: &Roster, si: StudentIdx) -> Option<ClassId> {
    let code = roster.students[si].group_code.as_deref()?;
    roster
        .students
        .iter()
        .enumerate()
        .find(|(i, s)| *i != si && s.group_code.as_deref() == Some(code) && s.assigned.is_some())
        .and_then(|(_, s)| s.assigned)
}

/// No admissible class is left: take the least populated class, relaxing capacity first,
/// then separation, then attribute acceptance, and record what was relaxed.
fn force_place(
    roster: &Roster,
    classification: &Classification,
    si: StudentIdx,
    sink: &dyn EventSink,
    conflicts: &mut Vec<Conflict>,
) -> ClassId {
    let sizes = roster.class_sizes();
    let least = |pool: Vec<ClassId>| {
        pool.into_iter()
            .min_by(|&a, &b| sizes[a].cmp(&sizes[b]).then(a.cmp(&b)))
    };

    let accepting: Vec<ClassId> = (0..roster.num_classes())
        .filter(|&c| roster.accepts(c, si))
        .collect();
    let safe: Vec<ClassId> = accepting
        .iter()
        .copied()
        .filter(|&c| roster.separation_safe(c, si, &[]))
        .collect();

    let (class, kind, reason) = if let Some(c) = least(safe) {
        (c, ConflictKind::CapacityExceeded, "placed over hard capacity")
    } else if let Some(c) = least(accepting) {
        (c, ConflictKind::UnresolvedSeparation, "placed beside a carrier of its separation code")
    } else {
        let all: Vec<ClassId> = (0..roster.num_classes()).collect();
        let safe_any: Vec<ClassId> = all
            .iter()
            .copied()
            .filter(|&c| roster.separation_safe(c, si, &[]))
            .collect();
        let c = least(safe_any).or_else(|| least(all)).unwrap_or(0);
        (c, ConflictKind::InfeasibleStudent, "force-placed into a class that does not offer its attributes")
    };

    let s = &roster.students[si];
    debug!(
        "Forcing {} ({}) into {}",
        s.id,
        classification.label(si),
        roster.classes[class].name
    );
    report_conflict(
        conflicts,
        sink,
        Conflict::new(
            kind,
            vec![s.id.clone()],
            Some(roster.classes[class].name.clone()),
            format!("student {} {}", s.id, reason),
        ),
    );
    class
}
