//! Mobility classification: which classes each student, or grouping cohort, may occupy.

use crate::events::{EventSink, PlacementEvent};
use crate::roster::{ClassId, Conflict, ConflictKind, Mobility, Roster, StudentIdx};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Classes a student may legally occupy right now: the quota table accepts its attributes
/// and no *other* class member carries its separation code. The student's own class is
/// never excluded on separation grounds; which carrier leaves is the resolver's decision.
pub fn compatible_classes(roster: &Roster, si: StudentIdx) -> Vec<ClassId> {
    let current = roster.students[si].assigned;
    (0..roster.num_classes())
        .filter(|&c| roster.accepts(c, si))
        .filter(|&c| Some(c) == current || roster.separation_safe(c, si, &[]))
        .collect()
}

/// Relocation test used by the resolver: compatible and free of the code, excluding the
/// student's current class.
pub fn relocation_targets(roster: &Roster, si: StudentIdx, except: &[StudentIdx]) -> Vec<ClassId> {
    let current = roster.students[si].assigned;
    (0..roster.num_classes())
        .filter(|&c| Some(c) != current)
        .filter(|&c| roster.accepts(c, si) && roster.separation_safe(c, si, except))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Admissible classes per student (cohort intersection for cohort members).
    pub compatible: Vec<Vec<ClassId>>,
    /// Label derived from the student's own attributes only.
    pub individual: Vec<Mobility>,
    /// Effective label; cohort members carry their cohort's label.
    pub labels: Vec<Mobility>,
    pub conflicts: Vec<Conflict>,
}

impl Classification {
    pub fn label(&self, si: StudentIdx) -> Mobility {
        self.labels[si]
    }

    /// May later phases move this student at all?
    pub fn is_movable(&self, si: StudentIdx) -> bool {
        matches!(self.labels[si], Mobility::Free | Mobility::SwappablePair)
    }

    pub fn is_individually_fixed(&self, si: StudentIdx) -> bool {
        self.individual[si] == Mobility::Fixed
    }

    /// Admissibility of `class` for a student under its label.
    pub fn allows(&self, roster: &Roster, si: StudentIdx, class: ClassId) -> bool {
        match self.labels[si] {
            Mobility::Free => roster.accepts(class, si),
            Mobility::Fixed | Mobility::SwappablePair => self.compatible[si].contains(&class),
            Mobility::Infeasible => false,
        }
    }

    pub fn count(&self, label: Mobility) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }
}

/// Labels every student FIXED / SWAPPABLE-PAIR / FREE / INFEASIBLE and records the label on
/// the student. A cohort whose members share no class is reported and its members keep
/// their individual labels.
pub fn classify(roster: &mut Roster, sink: &dyn EventSink) -> Classification {
    let n = roster.students.len();
    let mut compatible: Vec<Vec<ClassId>> = (0..n).map(|si| compatible_classes(roster, si)).collect();
    let individual: Vec<Mobility> = compatible
        .iter()
        .map(|c| Mobility::from_count(c.len()))
        .collect();
    let mut labels = individual.clone();
    let mut conflicts = Vec::new();

    for (code, members) in roster.cohorts() {
        let mut common = compatible[members[0]].clone();
        for &m in &members[1..] {
            common.retain(|c| compatible[m].contains(c));
        }

        if common.is_empty() {
            let ids: Vec<String> = members.iter().map(|&m| roster.students[m].id.clone()).collect();
            conflicts.push(Conflict::new(
                ConflictKind::InfeasibleCohort,
                ids,
                None,
                format!("grouping code {} has no class admissible for every member", code),
            ));
            continue;
        }

        let label = Mobility::from_count(common.len());
        debug!("Cohort {} ({} members) is {}", code, members.len(), label);
        for &m in &members {
            compatible[m] = common.clone();
            labels[m] = label;
        }
    }

    for si in 0..n {
        if labels[si] == Mobility::Infeasible {
            conflicts.push(Conflict::new(
                ConflictKind::InfeasibleStudent,
                vec![roster.students[si].id.clone()],
                None,
                format!("student {} has no admissible class", roster.students[si].id),
            ));
        }
        roster.students[si].mobility = Some(labels[si]);
    }

    for c in &conflicts {
        sink.on_event(&PlacementEvent::ConflictDetected(c.clone()));
    }

    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    for l in &labels {
        *tally.entry(l.to_string()).or_default() += 1;
    }
    info!("Mobility: {:?}", tally);

    Classification {
        compatible,
        individual,
        labels,
        conflicts,
    }
}
