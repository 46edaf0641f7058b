//! Phase 2: grouping and separation constraint resolution.

use crate::events::{assign_student, report_conflict, EventSink, Phase, PlacementEvent};
use crate::mobility::{relocation_targets, Classification};
use crate::roster::{ClassId, Conflict, ConflictKind, Mobility, Roster, StudentIdx};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ResolveReport {
    pub grouped: usize,
    pub separated: usize,
    pub conflicts: Vec<Conflict>,
}

pub fn resolve(
    roster: &mut Roster,
    classification: &Classification,
    sink: &dyn EventSink,
) -> ResolveReport {
    let mut report = ResolveReport::default();
    resolve_grouping(roster, classification, sink, &mut report);
    resolve_separation(roster, classification, sink, &mut report);
    report
}

/// Co-locates every grouping cohort in the class already holding most of its members.
pub fn resolve_grouping(
    roster: &mut Roster,
    classification: &Classification,
    sink: &dyn EventSink,
    report: &mut ResolveReport,
) {
    for (code, members) in roster.cohorts() {
        let movable: Vec<StudentIdx> = members
            .iter()
            .copied()
            .filter(|&m| match classification.individual[m] {
                Mobility::Infeasible => false,
                // An unplaced FIXED member still follows its cohort into its one class.
                Mobility::Fixed => roster.students[m].assigned.is_none(),
                _ => true,
            })
            .collect();
        let anchored: Vec<StudentIdx> = members
            .iter()
            .copied()
            .filter(|&m| classification.is_individually_fixed(m) && roster.students[m].assigned.is_some())
            .collect();

        let mut candidates: Vec<ClassId> = (0..roster.num_classes()).collect();
        for &m in &movable {
            candidates.retain(|c| classification.compatible[m].contains(c));
        }

        let anchor = anchored.first().and_then(|&a| roster.students[a].assigned);
        let target = match anchor {
            Some(a) if candidates.contains(&a) => Some(a),
            _ => pick_majority_class(roster, &members, &candidates, &code, &mut report.conflicts, sink),
        };

        let Some(target) = target else {
            let ids = members.iter().map(|&m| roster.students[m].id.clone()).collect();
            report_conflict(
                &mut report.conflicts,
                sink,
                Conflict::new(
                    ConflictKind::SplitCohort,
                    ids,
                    None,
                    format!("grouping code {} has no common class", code),
                ),
            );
            continue;
        };

        for &m in &movable {
            if roster.students[m].assigned != Some(target) {
                assign_student(roster, m, target, Phase::Grouping, sink);
                report.grouped += 1;
            }
        }

        let stranded: Vec<String> = anchored
            .iter()
            .filter(|&&a| roster.students[a].assigned != Some(target))
            .map(|&a| roster.students[a].id.clone())
            .collect();
        if !stranded.is_empty() {
            report_conflict(
                &mut report.conflicts,
                sink,
                Conflict::new(
                    ConflictKind::SplitCohort,
                    stranded,
                    Some(roster.classes[target].name.clone()),
                    format!("fixed members of grouping code {} cannot join their cohort", code),
                ),
            );
        }
    }

    info!("Phase 2: grouped {} students", report.grouped);
    sink.on_event(&PlacementEvent::PhaseFinished {
        phase: Phase::Grouping,
        count: report.grouped,
    });
}

/// Most members first, then least populated, then lowest index. Classes that would overflow
/// their hard capacity are used only when nothing else fits.
fn pick_majority_class(
    roster: &Roster,
    members: &[StudentIdx],
    candidates: &[ClassId],
    code: &str,
    conflicts: &mut Vec<Conflict>,
    sink: &dyn EventSink,
) -> Option<ClassId> {
    if candidates.is_empty() {
        return None;
    }
    let sizes = roster.class_sizes();
    let held = |c: ClassId| {
        members
            .iter()
            .filter(|&&m| roster.students[m].assigned == Some(c))
            .count()
    };
    let fits = |c: ClassId| sizes[c] + members.len() - held(c) <= roster.classes[c].capacity;

    let rank = |pool: &mut Vec<ClassId>| {
        pool.sort_by(|&a, &b| held(b).cmp(&held(a)).then(sizes[a].cmp(&sizes[b])).then(a.cmp(&b)));
        pool.first().copied()
    };

    let mut fitting: Vec<ClassId> = candidates.iter().copied().filter(|&c| fits(c)).collect();
    if let Some(c) = rank(&mut fitting) {
        return Some(c);
    }

    let mut all = candidates.to_vec();
    let chosen = rank(&mut all);
    if let Some(c) = chosen {
        report_conflict(
            conflicts,
            sink,
            Conflict::new(
                ConflictKind::CapacityExceeded,
                Vec::new(),
                Some(roster.classes[c].name.clone()),
                format!("co-locating grouping code {} exceeds hard capacity", code),
            ),
        );
    }
    chosen
}

/// Separates carriers of a shared code, most constrained codes first.
pub fn resolve_separation(
    roster: &mut Roster,
    classification: &Classification,
    sink: &dyn EventSink,
    report: &mut ResolveReport,
) {
    let mut cohorts: Vec<(String, Vec<StudentIdx>)> = roster.separation_cohorts().into_iter().collect();
    cohorts.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

    for (code, carriers) in cohorts {
        let mut by_class: BTreeMap<ClassId, Vec<StudentIdx>> = BTreeMap::new();
        for &si in &carriers {
            if let Some(c) = roster.students[si].assigned {
                by_class.entry(c).or_default().push(si);
            }
        }

        for (class, list) in by_class {
            if list.len() < 2 {
                continue;
            }
            let keeper = list
                .iter()
                .copied()
                .find(|&s| !classification.is_movable(s))
                .unwrap_or(list[0]);

            for &si in list.iter().filter(|&&s| s != keeper) {
                // Already carried out of the class along with its cohort.
                if roster.students[si].assigned != Some(class) {
                    continue;
                }

                let reason = if !classification.is_movable(si) {
                    Some("fixed student")
                } else if roster.in_cohort(si) && cohort_carriers(roster, si, &code) > 1 {
                    Some("grouping and separation codes conflict for")
                } else {
                    let moved = if roster.in_cohort(si) {
                        relocate_cohort(roster, classification, si, sink)
                    } else {
                        relocate_single(roster, classification, si, sink)
                    };
                    match moved {
                        false => Some("no class without the code can take"),
                        true if shares_code(roster, si, &code) => Some("relocation still shares a class for"),
                        true => None,
                    }
                };

                let Some(reason) = reason else {
                    report.separated += 1;
                    continue;
                };
                let ids = vec![
                    roster.students[keeper].id.clone(),
                    roster.students[si].id.clone(),
                ];
                report_conflict(
                    &mut report.conflicts,
                    sink,
                    Conflict::new(
                        ConflictKind::UnresolvedSeparation,
                        ids,
                        Some(roster.classes[class].name.clone()),
                        format!("separation code {}: {} {}", code, reason, roster.students[si].id),
                    ),
                );
            }
        }
    }

    info!("Phase 2: separated {} students", report.separated);
    sink.on_event(&PlacementEvent::PhaseFinished {
        phase: Phase::Separation,
        count: report.separated,
    });
}

/// Members of the grouping cohort of `si` that also carry separation `code`.
fn cohort_carriers(roster: &Roster, si: StudentIdx, code: &str) -> usize {
    let group = roster.students[si].group_code.as_deref();
    roster
        .students
        .iter()
        .filter(|s| group.is_some() && s.group_code.as_deref() == group)
        .filter(|s| s.separation_code.as_deref() == Some(code))
        .count()
}

fn shares_code(roster: &Roster, si: StudentIdx, code: &str) -> bool {
    roster.students[si]
        .assigned
        .is_some_and(|c| roster.holds_separation_code(c, code, &[si]))
}

fn least_populated(roster: &Roster, mut pool: Vec<ClassId>) -> Option<ClassId> {
    let sizes = roster.class_sizes();
    pool.retain(|&c| sizes[c] < roster.classes[c].capacity);
    pool.into_iter().min_by(|&a, &b| sizes[a].cmp(&sizes[b]).then(a.cmp(&b)))
}

fn relocate_single(
    roster: &mut Roster,
    classification: &Classification,
    si: StudentIdx,
    sink: &dyn EventSink,
) -> bool {
    let pool: Vec<ClassId> = relocation_targets(roster, si, &[])
        .into_iter()
        .filter(|&c| classification.allows(roster, si, c))
        .collect();
    match least_populated(roster, pool) {
        Some(to) => {
            assign_student(roster, si, to, Phase::Separation, sink);
            true
        }
        None => false,
    }
}

/// Moves a whole grouping cohort so that separating one member does not split it.
fn relocate_cohort(
    roster: &mut Roster,
    classification: &Classification,
    si: StudentIdx,
    sink: &dyn EventSink,
) -> bool {
    let Some(code) = roster.students[si].group_code.clone() else {
        return false;
    };
    let members: Vec<StudentIdx> = (0..roster.students.len())
        .filter(|&m| roster.students[m].group_code.as_deref() == Some(code.as_str()))
        .collect();
    if members.iter().any(|&m| !classification.is_movable(m)) {
        return false;
    }

    let current = roster.students[si].assigned;
    let sizes = roster.class_sizes();
    let mut pool: Vec<ClassId> = (0..roster.num_classes())
        .filter(|&c| Some(c) != current)
        .filter(|&c| {
            members.iter().all(|&m| {
                classification.allows(roster, m, c) && roster.separation_safe(c, m, &members)
            })
        })
        .filter(|&c| sizes[c] + members.len() <= roster.classes[c].capacity)
        .collect();
    pool.sort_by(|&a, &b| sizes[a].cmp(&sizes[b]).then(a.cmp(&b)));

    match pool.first() {
        Some(&to) => {
            for &m in &members {
                assign_student(roster, m, to, Phase::Separation, sink);
            }
            true
        }
        None => false,
    }
}
