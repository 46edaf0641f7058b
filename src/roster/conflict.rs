use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ConflictKind {
    InfeasibleStudent,
    InfeasibleCohort,
    UnresolvedSeparation,
    SplitCohort,
    QuotaShortfall,
    CapacityExceeded,
}

/// A known constraint problem, surfaced to the caller instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub kind: ConflictKind,
    pub students: Vec<String>,
    pub class: Option<String>,
    pub detail: String,
}

impl Conflict {
    pub fn new(kind: ConflictKind, students: Vec<String>, class: Option<String>, detail: String) -> Self {
        Self {
            kind,
            students,
            class,
            detail,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.detail)?;
        if let Some(c) = &self.class {
            write!(f, " (class {})", c)?;
        }
        Ok(())
    }
}

/// Two or more carriers of one separation code sharing a class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeparationViolation {
    pub code: String,
    pub class: String,
    pub students: Vec<String>,
}

impl fmt::Display for SeparationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "code {} shared in {} by {}",
            self.code,
            self.class,
            self.students.join(", ")
        )
    }
}
