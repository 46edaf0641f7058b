pub mod checks;
pub mod conflict;
pub mod loader;

pub use self::conflict::{Conflict, ConflictKind, SeparationViolation};

use crate::config::AttributeDefinitions;
use crate::error::{PlResult, PlacementError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use strum_macros::{Display, EnumIter, EnumString};

/// Position of a student inside `Roster::students`.
pub type StudentIdx = usize;
/// Position of a class inside `Roster::classes`.
pub type ClassId = usize;

pub const SCORE_MIN: f32 = 1.0;
pub const SCORE_MAX: f32 = 4.0;
pub const SCORE_MIDPOINT: f32 = 2.5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    #[strum(serialize = "F")]
    #[serde(rename = "F")]
    Female,
    #[strum(serialize = "M")]
    #[serde(rename = "M")]
    Male,
    #[default]
    #[strum(serialize = "?")]
    #[serde(rename = "?")]
    Unknown,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum Mobility {
    #[strum(serialize = "FIXED")]
    Fixed,
    #[strum(serialize = "SWAPPABLE-PAIR")]
    SwappablePair,
    #[strum(serialize = "FREE")]
    Free,
    #[strum(serialize = "INFEASIBLE")]
    Infeasible,
}

impl Mobility {
    /// Label for a set of `n` admissible classes.
    pub fn from_count(n: usize) -> Self {
        match n {
            0 => Mobility::Infeasible,
            1 => Mobility::Fixed,
            2 => Mobility::SwappablePair,
            _ => Mobility::Free,
        }
    }
}

/// Academic scores on the 1-4 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub communication: f32,
    pub work: f32,
    pub participation: f32,
    pub absence: f32,
}

impl Default for Scores {
    fn default() -> Self {
        Self {
            communication: SCORE_MIDPOINT,
            work: SCORE_MIDPOINT,
            participation: SCORE_MIDPOINT,
            absence: SCORE_MIDPOINT,
        }
    }
}

impl Scores {
    pub fn uniform(v: f32) -> Self {
        Self {
            communication: v,
            work: v,
            participation: v,
            absence: v,
        }
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.communication, self.work, self.participation, self.absence]
    }

    /// Mean of the four scores.
    pub fn profile(&self) -> f32 {
        self.as_array().iter().sum::<f32>() / 4.0
    }

    /// Rejects a record with any score off the 1-4 scale.
    pub fn check_range(&self, student: &str) -> PlResult<()> {
        match self.as_array().into_iter().find(|v| !(SCORE_MIN..=SCORE_MAX).contains(v)) {
            Some(v) => Err(PlacementError::Validation(format!(
                "student '{}': score {} outside {}..={}",
                student, v, SCORE_MIN, SCORE_MAX
            ))),
            None => Ok(()),
        }
    }
}

/// Elective attributes. Fixed keys, validated against the vocabulary at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub language: Option<String>,
    pub option: Option<String>,
}

impl Attributes {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.language
            .as_deref()
            .into_iter()
            .chain(self.option.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.language.is_none() && self.option.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub last_name: String,
    pub first_name: String,
    pub gender: Gender,
    pub scores: Scores,
    pub attributes: Attributes,
    pub group_code: Option<String>,
    pub separation_code: Option<String>,

    // Mutated by the engine
    pub assigned: Option<ClassId>,
    pub mobility: Option<Mobility>,
}

impl Student {
    pub fn new(id: impl Into<String>, gender: Gender) -> Self {
        Self {
            id: id.into(),
            last_name: String::new(),
            first_name: String::new(),
            gender,
            scores: Scores::default(),
            attributes: Attributes::default(),
            group_code: None,
            separation_code: None,
            assigned: None,
            mobility: None,
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.attributes.language = Some(language.to_ascii_uppercase());
        self
    }

    pub fn with_option(mut self, option: &str) -> Self {
        self.attributes.option = Some(option.to_ascii_uppercase());
        self
    }

    pub fn with_group(mut self, code: &str) -> Self {
        self.group_code = Some(code.to_string());
        self
    }

    pub fn with_separation(mut self, code: &str) -> Self {
        self.separation_code = Some(code.to_string());
        self
    }

    pub fn with_scores(mut self, scores: Scores) -> Self {
        self.scores = scores;
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.mobility == Some(Mobility::Fixed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSlot {
    pub name: String,
    pub target_size: usize,
    pub capacity: usize,
    pub quotas: BTreeMap<String, u32>,
}

impl ClassSlot {
    pub fn new(name: impl Into<String>, target_size: usize, capacity: usize) -> Self {
        Self {
            name: name.into(),
            target_size,
            capacity,
            quotas: BTreeMap::new(),
        }
    }

    pub fn with_quota(mut self, attr: &str, quota: u32) -> Self {
        self.quotas.insert(attr.to_ascii_uppercase(), quota);
        self
    }

    pub fn quota(&self, attr: &str) -> u32 {
        self.quotas.get(attr).copied().unwrap_or(0)
    }

    pub fn offers(&self, attr: &str) -> bool {
        self.quota(attr) > 0
    }
}

/// Closed attribute vocabularies, passed explicitly to every phase.
///
/// `universal` lists the values every class offers (typically the first foreign language);
/// they carry no placement signal and are ignored by dispatch and acceptance tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub languages: BTreeSet<String>,
    pub options: BTreeSet<String>,
    pub universal: BTreeSet<String>,
}

impl Vocabulary {
    pub fn new<L, O>(languages: L, options: O) -> Self
    where
        L: IntoIterator,
        L::Item: AsRef<str>,
        O: IntoIterator,
        O::Item: AsRef<str>,
    {
        Self {
            languages: languages
                .into_iter()
                .map(|s| s.as_ref().to_ascii_uppercase())
                .collect(),
            options: options
                .into_iter()
                .map(|s| s.as_ref().to_ascii_uppercase())
                .collect(),
            universal: BTreeSet::new(),
        }
    }

    pub fn with_universal<U>(mut self, universal: U) -> Self
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
    {
        self.universal = universal
            .into_iter()
            .map(|s| s.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    pub fn from_definitions(defs: &AttributeDefinitions) -> Self {
        Self::new(defs.get_languages(), defs.get_options()).with_universal(defs.get_universal())
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.languages.contains(attr) || self.options.contains(attr)
    }
}

/// The in-memory roster owned by one run.
#[derive(Debug, Clone)]
pub struct Roster {
    pub students: Vec<Student>,
    pub classes: Vec<ClassSlot>,
    pub vocabulary: Vocabulary,
    index: HashMap<String, StudentIdx>,
    class_index: HashMap<String, ClassId>,
}

impl Roster {
    /// Builds a roster and validates its structure (non-empty, unique ids, closed vocabulary).
    pub fn new(
        students: Vec<Student>,
        classes: Vec<ClassSlot>,
        vocabulary: Vocabulary,
    ) -> PlResult<Self> {
        if students.is_empty() {
            return Err(PlacementError::EmptyRoster);
        }
        if classes.is_empty() {
            return Err(PlacementError::EmptyClasses);
        }
        for s in &students {
            s.scores.check_range(&s.id)?;
        }
        checks::check_structure(&students, &classes, &vocabulary)?;

        let index = students
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let class_index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Ok(Self {
            students,
            classes,
            vocabulary,
            index,
            class_index,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn index_of(&self, id: &str) -> Option<StudentIdx> {
        self.index.get(id).copied()
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_index.get(name).copied()
    }

    /// Offered by every class, so it carries no placement signal.
    pub fn is_universal(&self, attr: &str) -> bool {
        self.vocabulary.universal.contains(attr)
    }

    /// Attributes of a student that constrain placement.
    pub fn placement_attributes<'a>(&'a self, s: &'a Student) -> impl Iterator<Item = &'a str> {
        s.attributes.iter().filter(move |a| !self.is_universal(a))
    }

    /// Attribute-level acceptance: the class quota table offers every non-universal attribute.
    pub fn accepts(&self, class: ClassId, student: StudentIdx) -> bool {
        let slot = &self.classes[class];
        self.placement_attributes(&self.students[student])
            .all(|a| slot.offers(a))
    }

    pub fn members(&self, class: ClassId) -> Vec<StudentIdx> {
        self.students
            .iter()
            .enumerate()
            .filter(|(_, s)| s.assigned == Some(class))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn class_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.classes.len()];
        for s in &self.students {
            if let Some(c) = s.assigned {
                sizes[c] += 1;
            }
        }
        sizes
    }

    pub fn carriers_in(&self, class: ClassId, attr: &str) -> u32 {
        self.students
            .iter()
            .filter(|s| s.assigned == Some(class) && s.attributes.iter().any(|a| a == attr))
            .count() as u32
    }

    pub fn unassigned(&self) -> Vec<StudentIdx> {
        self.students
            .iter()
            .enumerate()
            .filter(|(_, s)| s.assigned.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.students.iter().filter(|s| s.assigned.is_some()).count()
    }

    /// Grouping codes carried by at least two students.
    pub fn cohorts(&self) -> BTreeMap<String, Vec<StudentIdx>> {
        shared_codes(self.students.iter().map(|s| s.group_code.as_deref()))
    }

    /// Separation codes carried by at least two students.
    pub fn separation_cohorts(&self) -> BTreeMap<String, Vec<StudentIdx>> {
        shared_codes(self.students.iter().map(|s| s.separation_code.as_deref()))
    }

    /// True when the student belongs to a grouping cohort of two or more.
    pub fn in_cohort(&self, student: StudentIdx) -> bool {
        match &self.students[student].group_code {
            Some(code) => self
                .students
                .iter()
                .enumerate()
                .any(|(i, s)| i != student && s.group_code.as_ref() == Some(code)),
            None => false,
        }
    }

    /// Does `class` hold a carrier of `code` other than the students in `except`?
    pub fn holds_separation_code(&self, class: ClassId, code: &str, except: &[StudentIdx]) -> bool {
        self.students.iter().enumerate().any(|(i, s)| {
            s.assigned == Some(class)
                && s.separation_code.as_deref() == Some(code)
                && !except.contains(&i)
        })
    }

    /// Separation-safe for a single student moving into `class`.
    pub fn separation_safe(&self, class: ClassId, student: StudentIdx, except: &[StudentIdx]) -> bool {
        match &self.students[student].separation_code {
            Some(code) => {
                let mut skip = except.to_vec();
                skip.push(student);
                !self.holds_separation_code(class, code, &skip)
            }
            None => true,
        }
    }

    pub fn class_name(&self, class: Option<ClassId>) -> &str {
        match class {
            Some(c) => &self.classes[c].name,
            None => "-",
        }
    }

    /// Student id to class name for every placed student.
    pub fn assignment_map(&self) -> BTreeMap<String, String> {
        self.students
            .iter()
            .filter_map(|s| s.assigned.map(|c| (s.id.clone(), self.classes[c].name.clone())))
            .collect()
    }

    pub fn assignment(&self) -> Vec<Option<ClassId>> {
        self.students.iter().map(|s| s.assigned).collect()
    }

    pub fn restore_assignment(&mut self, assignment: &[Option<ClassId>]) {
        for (s, &c) in self.students.iter_mut().zip(assignment) {
            s.assigned = c;
        }
    }
}

fn shared_codes<'a>(codes: impl Iterator<Item = Option<&'a str>>) -> BTreeMap<String, Vec<StudentIdx>> {
    let mut map: BTreeMap<String, Vec<StudentIdx>> = BTreeMap::new();
    for (i, code) in codes.enumerate() {
        if let Some(c) = code {
            map.entry(c.to_string()).or_default().push(i);
        }
    }
    map.retain(|_, members| members.len() >= 2);
    map
}
