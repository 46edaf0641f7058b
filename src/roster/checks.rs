use super::{ClassSlot, Roster, SeparationViolation, Student};
use crate::error::{PlResult, PlacementError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Structural validation run once when a roster is built.
pub fn check_structure(
    students: &[Student],
    classes: &[ClassSlot],
    vocabulary: &super::Vocabulary,
) -> PlResult<()> {
    let mut errors = Vec::new();

    if let Some(shared) = vocabulary.languages.intersection(&vocabulary.options).next() {
        errors.push(format!(
            "attribute '{}' is both a language and an option",
            shared
        ));
    }

    for u in &vocabulary.universal {
        if !vocabulary.contains(u) {
            errors.push(format!("universal attribute '{}' is not in the vocabulary", u));
        }
    }

    let mut seen = HashSet::new();
    for s in students {
        if !seen.insert(s.id.as_str()) {
            errors.push(format!("duplicate student id '{}'", s.id));
        }
        if let Some(lang) = &s.attributes.language {
            if !vocabulary.languages.contains(lang) {
                errors.push(format!("student '{}': unknown language '{}'", s.id, lang));
            }
        }
        if let Some(opt) = &s.attributes.option {
            if !vocabulary.options.contains(opt) {
                errors.push(format!("student '{}': unknown option '{}'", s.id, opt));
            }
        }
    }

    let mut names = HashSet::new();
    for c in classes {
        if !names.insert(c.name.as_str()) {
            errors.push(format!("duplicate class '{}'", c.name));
        }
        if c.target_size == 0 {
            errors.push(format!("class '{}': target size is zero", c.name));
        }
        if c.target_size > c.capacity {
            errors.push(format!(
                "class '{}': target size {} above capacity {}",
                c.name, c.target_size, c.capacity
            ));
        }
        for attr in c.quotas.keys() {
            if !vocabulary.contains(attr) {
                errors.push(format!("class '{}': quota for unknown attribute '{}'", c.name, attr));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PlacementError::Configuration(errors))
    }
}

/// The sum of quotas for a placement attribute may not exceed the number of its carriers.
pub fn check_quota_supply(roster: &Roster) -> PlResult<()> {
    let mut demand: BTreeMap<&str, u32> = BTreeMap::new();
    for c in &roster.classes {
        for (attr, &q) in &c.quotas {
            if !roster.is_universal(attr) {
                *demand.entry(attr.as_str()).or_default() += q;
            }
        }
    }

    let mut errors = Vec::new();
    for (attr, total) in demand {
        let supply = roster
            .students
            .iter()
            .filter(|s| s.attributes.iter().any(|a| a == attr))
            .count() as u32;
        if total > supply {
            errors.push(format!(
                "quotas for '{}' sum to {} but only {} students carry it",
                attr, total, supply
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PlacementError::Configuration(errors))
    }
}

/// Rebuilds every separation violation from the current assignment.
pub fn separation_violations(roster: &Roster) -> Vec<SeparationViolation> {
    let mut out = Vec::new();
    for (code, carriers) in roster.separation_cohorts() {
        let mut by_class: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for i in carriers {
            if let Some(c) = roster.students[i].assigned {
                by_class
                    .entry(c)
                    .or_default()
                    .push(roster.students[i].id.clone());
            }
        }
        for (c, ids) in by_class {
            if ids.len() >= 2 {
                out.push(SeparationViolation {
                    code: code.clone(),
                    class: roster.classes[c].name.clone(),
                    students: ids,
                });
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaOverrun {
    pub class: String,
    pub attribute: String,
    pub placed: u32,
    pub quota: u32,
}

/// Classes holding more carriers of an attribute than their quota allows.
pub fn quota_overruns(roster: &Roster) -> Vec<QuotaOverrun> {
    let mut out = Vec::new();
    for (ci, c) in roster.classes.iter().enumerate() {
        let attrs: BTreeSet<&str> = roster
            .students
            .iter()
            .filter(|s| s.assigned == Some(ci))
            .flat_map(|s| s.attributes.iter())
            .filter(|a| !roster.is_universal(a))
            .collect();
        for attr in attrs {
            let placed = roster.carriers_in(ci, attr);
            let quota = c.quota(attr);
            if placed > quota {
                out.push(QuotaOverrun {
                    class: c.name.clone(),
                    attribute: attr.to_string(),
                    placed,
                    quota,
                });
            }
        }
    }
    out
}

/// Grouping codes whose placed members sit in more than one class.
pub fn split_cohorts(roster: &Roster) -> Vec<(String, Vec<String>)> {
    roster
        .cohorts()
        .into_iter()
        .filter_map(|(code, members)| {
            let classes: BTreeSet<&str> = members
                .iter()
                .filter_map(|&i| roster.students[i].assigned)
                .map(|c| roster.classes[c].name.as_str())
                .collect();
            if classes.len() > 1 {
                Some((code, classes.into_iter().map(String::from).collect()))
            } else {
                None
            }
        })
        .collect()
}
