use super::{Attributes, ClassSlot, Gender, Roster, Scores, Student, Vocabulary, SCORE_MIDPOINT};
use crate::error::{PlResult, PlacementError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct StudentRecord {
    id: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    gender: String,
    #[serde(default)]
    communication: Option<f32>,
    #[serde(default)]
    work: Option<f32>,
    #[serde(default)]
    participation: Option<f32>,
    #[serde(default)]
    absence: Option<f32>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    option: Option<String>,
    #[serde(default)]
    group_code: Option<String>,
    #[serde(default)]
    separation_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClassRecord {
    name: String,
    target_size: usize,
    #[serde(default)]
    capacity: Option<usize>,
    #[serde(default)]
    quotas: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssignmentRecord {
    student_id: String,
    class: String,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_gender(raw: &str, id: &str) -> PlResult<Gender> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Gender::Unknown);
    }
    Gender::from_str(raw)
        .map_err(|_| PlacementError::Validation(format!("student '{}': unknown gender '{}'", id, raw)))
}

/// Parses `ATTR:N;ATTR:N` (`=` is accepted in place of `:`).
pub fn parse_quotas(raw: &str) -> PlResult<Vec<(String, u32)>> {
    let mut out = Vec::new();
    for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (attr, count) = part
            .split_once(':')
            .or_else(|| part.split_once('='))
            .ok_or_else(|| PlacementError::Validation(format!("malformed quota '{}'", part)))?;
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| PlacementError::Validation(format!("malformed quota '{}'", part)))?;
        out.push((attr.trim().to_ascii_uppercase(), count));
    }
    Ok(out)
}

pub fn read_students<R: Read>(reader: R) -> PlResult<Vec<Student>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut students = Vec::new();
    for result in rdr.deserialize() {
        let rec: StudentRecord = result?;
        let gender = parse_gender(&rec.gender, &rec.id)?;
        let score = |v: Option<f32>| v.unwrap_or(SCORE_MIDPOINT);
        let scores = Scores {
            communication: score(rec.communication),
            work: score(rec.work),
            participation: score(rec.participation),
            absence: score(rec.absence),
        };
        scores.check_range(&rec.id)?;
        students.push(Student {
            gender,
            scores,
            attributes: Attributes {
                language: non_empty(rec.language).map(|s| s.to_ascii_uppercase()),
                option: non_empty(rec.option).map(|s| s.to_ascii_uppercase()),
            },
            group_code: non_empty(rec.group_code),
            separation_code: non_empty(rec.separation_code),
            last_name: rec.last_name,
            first_name: rec.first_name,
            assigned: None,
            mobility: None,
            id: rec.id,
        });
    }
    debug!("Read {} students", students.len());
    Ok(students)
}

pub fn read_classes<R: Read>(reader: R) -> PlResult<Vec<ClassSlot>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut classes = Vec::new();
    for result in rdr.deserialize() {
        let rec: ClassRecord = result?;
        let mut slot = ClassSlot::new(
            rec.name,
            rec.target_size,
            rec.capacity.unwrap_or(rec.target_size),
        );
        for (attr, q) in parse_quotas(&rec.quotas)? {
            slot.quotas.insert(attr, q);
        }
        classes.push(slot);
    }
    debug!("Read {} classes", classes.len());
    Ok(classes)
}

pub fn load_roster<P: AsRef<Path>>(
    students_path: P,
    classes_path: P,
    vocabulary: Vocabulary,
) -> PlResult<Roster> {
    let students = read_students(File::open(students_path.as_ref())?)?;
    let classes = read_classes(File::open(classes_path.as_ref())?)?;
    info!(
        "Loaded {} students and {} classes",
        students.len(),
        classes.len()
    );
    Roster::new(students, classes, vocabulary)
}

pub fn read_assignment<R: Read>(reader: R) -> PlResult<Vec<(String, String)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut pairs = Vec::new();
    for result in rdr.deserialize() {
        let rec: AssignmentRecord = result?;
        pairs.push((rec.student_id, rec.class));
    }
    Ok(pairs)
}

/// Applies `(student id, class name)` pairs onto the roster, replacing any prior placement.
pub fn apply_assignment(roster: &mut Roster, pairs: &[(String, String)]) -> PlResult<()> {
    for s in roster.students.iter_mut() {
        s.assigned = None;
    }
    for (id, class) in pairs {
        let si = roster
            .index_of(id)
            .ok_or_else(|| PlacementError::Validation(format!("unknown student '{}'", id)))?;
        let ci = roster
            .class_by_name(class)
            .ok_or_else(|| PlacementError::Validation(format!("unknown class '{}'", class)))?;
        roster.students[si].assigned = Some(ci);
    }
    Ok(())
}

pub fn write_assignment<W: Write>(writer: W, roster: &Roster) -> PlResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (student_id, class) in roster.assignment_map() {
        wtr.serialize(AssignmentRecord { student_id, class })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_assignment<P: AsRef<Path>>(path: P, roster: &Roster) -> PlResult<()> {
    write_assignment(File::create(path)?, roster)
}
