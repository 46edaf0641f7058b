//! Phase 1: quota-driven dispatch of students carrying a scarce language or option.

use crate::events::{report_conflict, EventSink, Phase, PlacementEvent};
use crate::roster::{ClassId, Conflict, ConflictKind, Roster, StudentIdx};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub placed: usize,
    pub conflicts: Vec<Conflict>,
}

struct ClassLoad {
    size: usize,
    carriers: BTreeMap<String, u32>,
}

impl ClassLoad {
    fn carriers(&self, attr: &str) -> u32 {
        self.carriers.get(attr).copied().unwrap_or(0)
    }
}

/// Places attribute carriers into classes whose quota for that attribute is unmet.
///
/// Classes are visited in order, and each class's attributes in name order; students are
/// scanned in roster order, so the result depends only on the input. Attribute-free
/// students and carriers of universal attributes are left for Phase 3.
pub fn dispatch(roster: &mut Roster, sink: &dyn EventSink) -> DispatchReport {
    let mut report = DispatchReport::default();
    let mut loads = current_loads(roster);

    for ci in 0..roster.num_classes() {
        let quotas: Vec<(String, u32)> = roster.classes[ci]
            .quotas
            .iter()
            .filter(|(attr, q)| **q > 0 && !roster.is_universal(attr))
            .map(|(a, q)| (a.clone(), *q))
            .collect();

        for (attr, quota) in quotas {
            let target = roster.classes[ci].target_size;

            for si in 0..roster.students.len() {
                if loads[ci].carriers(&attr) >= quota {
                    break;
                }
                if loads[ci].size >= target {
                    let remaining = quota - loads[ci].carriers(&attr);
                    report_conflict(
                        &mut report.conflicts,
                        sink,
                        Conflict::new(
                            ConflictKind::QuotaShortfall,
                            Vec::new(),
                            Some(roster.classes[ci].name.clone()),
                            format!("{} '{}' places left unfilled at target size", remaining, attr),
                        ),
                    );
                    break;
                }

                if !is_candidate(roster, si, &attr) || !fits(roster, &loads[ci], ci, si) {
                    continue;
                }

                place(roster, &mut loads[ci], ci, si);
                report.placed += 1;
                debug!(
                    "Dispatched {} to {} for '{}'",
                    roster.students[si].id, roster.classes[ci].name, attr
                );
                sink.on_event(&PlacementEvent::Placed {
                    phase: Phase::Dispatch,
                    student: roster.students[si].id.clone(),
                    class: roster.classes[ci].name.clone(),
                });
            }
        }
    }

    info!("Phase 1: dispatched {} students", report.placed);
    sink.on_event(&PlacementEvent::PhaseFinished {
        phase: Phase::Dispatch,
        count: report.placed,
    });
    report
}

fn current_loads(roster: &Roster) -> Vec<ClassLoad> {
    let mut loads: Vec<ClassLoad> = (0..roster.num_classes())
        .map(|_| ClassLoad {
            size: 0,
            carriers: BTreeMap::new(),
        })
        .collect();
    for s in &roster.students {
        if let Some(c) = s.assigned {
            loads[c].size += 1;
            for a in s.attributes.iter() {
                *loads[c].carriers.entry(a.to_string()).or_default() += 1;
            }
        }
    }
    loads
}

fn is_candidate(roster: &Roster, si: StudentIdx, attr: &str) -> bool {
    let s = &roster.students[si];
    s.assigned.is_none() && s.attributes.iter().any(|a| a == attr)
}

/// The class must offer the student's other attribute too, and no quota may be overrun.
fn fits(roster: &Roster, load: &ClassLoad, ci: ClassId, si: StudentIdx) -> bool {
    if !roster.accepts(ci, si) || load.size >= roster.classes[ci].capacity {
        return false;
    }
    let slot = &roster.classes[ci];
    roster
        .placement_attributes(&roster.students[si])
        .all(|a| load.carriers(a) < slot.quota(a))
}

fn place(roster: &mut Roster, load: &mut ClassLoad, ci: ClassId, si: StudentIdx) {
    let s = &mut roster.students[si];
    s.assigned = Some(ci);
    load.size += 1;
    for a in s.attributes.iter() {
        *load.carriers.entry(a.to_string()).or_default() += 1;
    }
}
