mod common;

use classforge::roster::loader::{
    apply_assignment, load_roster, parse_quotas, read_assignment, read_classes, read_students,
    save_assignment, write_assignment,
};
use classforge::roster::{Gender, Roster, SCORE_MIDPOINT};
use classforge::PlacementError;
use common::*;
use std::fs;
use std::io::Cursor;
use tempfile::tempdir;

const STUDENTS: &str = "\
id,last_name,first_name,gender,communication,work,participation,absence,language,option,group_code,separation_code
S1,Durand,Ana,F,3,4,3.5,2,ita,latin,G1,
S2,Martin,Leo,m,,,,,ESP,,G1,D1
S3,Petit,Sam,,1,1,1,1,,,,D1
";

const CLASSES: &str = "\
name,target_size,capacity,quotas
6A,24,26,ITA:2;LATIN:3
6B,24,,ESP=4
";

#[test]
fn test_read_students_fields_and_defaults() {
    let students = read_students(Cursor::new(STUDENTS)).unwrap();

    assert_eq!(students.len(), 3);
    let s1 = &students[0];
    assert_eq!(s1.id, "S1");
    assert_eq!(s1.first_name, "Ana");
    assert_eq!(s1.gender, Gender::Female);
    assert_eq!(s1.scores.participation, 3.5);
    assert_eq!(s1.attributes.language.as_deref(), Some("ITA"));
    assert_eq!(s1.attributes.option.as_deref(), Some("LATIN"));
    assert_eq!(s1.group_code.as_deref(), Some("G1"));
    assert_eq!(s1.separation_code, None);

    let s2 = &students[1];
    assert_eq!(s2.gender, Gender::Male);
    assert_eq!(s2.scores.communication, SCORE_MIDPOINT);
    assert_eq!(s2.scores.profile(), SCORE_MIDPOINT);
    assert_eq!(s2.attributes.option, None);
    assert_eq!(s2.separation_code.as_deref(), Some("D1"));

    assert_eq!(students[2].gender, Gender::Unknown);
    assert!(students[2].attributes.is_empty());
    assert!(students.iter().all(|s| s.assigned.is_none()));
}

#[test]
fn test_unknown_gender_is_rejected() {
    let csv = "id,gender\nS1,X\n";
    let err = read_students(Cursor::new(csv)).unwrap_err();
    assert!(matches!(err, PlacementError::Validation(msg) if msg.contains("S1")));
}

#[test]
fn test_score_off_scale_is_a_validation_error() {
    let csv = "id,gender,communication,work\nS1,F,3,4\nS2,M,4.5,2\n";
    let err = read_students(Cursor::new(csv)).unwrap_err();
    assert!(matches!(err, PlacementError::Validation(msg) if msg.contains("S2") && msg.contains("4.5")));

    let mut students = read_students(Cursor::new(STUDENTS)).unwrap();
    students[2].scores.absence = 0.0;
    let classes = read_classes(Cursor::new(CLASSES)).unwrap();
    let err = Roster::new(students, classes, vocabulary()).unwrap_err();
    assert!(matches!(err, PlacementError::Validation(msg) if msg.contains("S3")));
}

#[test]
fn test_read_classes_with_capacity_default() {
    let classes = read_classes(Cursor::new(CLASSES)).unwrap();

    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0].capacity, 26);
    assert_eq!(classes[0].quota("ITA"), 2);
    assert_eq!(classes[0].quota("LATIN"), 3);
    assert_eq!(classes[1].capacity, 24);
    assert_eq!(classes[1].quota("ESP"), 4);
    assert!(!classes[1].offers("ITA"));
}

#[test]
fn test_parse_quotas() {
    assert_eq!(
        parse_quotas(" ita:2 ; Latin=1;").unwrap(),
        vec![("ITA".to_string(), 2), ("LATIN".to_string(), 1)]
    );
    assert!(parse_quotas("").unwrap().is_empty());
    assert!(parse_quotas("ITA").is_err());
    assert!(parse_quotas("ITA:two").is_err());
}

#[test]
fn test_unknown_attribute_fails_roster_build() {
    let mut students = read_students(Cursor::new(STUDENTS)).unwrap();
    students[0].attributes.language = Some("KLINGON".to_string());
    let classes = read_classes(Cursor::new(CLASSES)).unwrap();

    let err = Roster::new(students, classes, vocabulary()).unwrap_err();
    match err {
        PlacementError::Configuration(errors) => {
            assert!(errors.iter().any(|e| e.contains("KLINGON")));
        }
        other => panic!("unexpected error {}", other),
    }
}

#[test]
fn test_duplicate_ids_are_reported() {
    let csv = "id,gender\nS1,F\nS1,M\n";
    let students = read_students(Cursor::new(csv)).unwrap();
    let err = Roster::new(students, vec![class("A", 10)], vocabulary()).unwrap_err();
    assert!(matches!(err, PlacementError::Configuration(e) if e[0].contains("duplicate")));
}

#[test]
fn test_load_roster_from_files() {
    let dir = tempdir().unwrap();
    let students = dir.path().join("students.csv");
    let classes = dir.path().join("classes.csv");
    fs::write(&students, STUDENTS).unwrap();
    fs::write(&classes, CLASSES).unwrap();

    let roster = load_roster(&students, &classes, vocabulary()).unwrap();

    assert_eq!(roster.students.len(), 3);
    assert_eq!(roster.class_by_name("6B"), Some(1));
    assert_eq!(roster.index_of("S3"), Some(2));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.csv");
    let err = load_roster(&missing, &missing, vocabulary()).unwrap_err();
    assert!(matches!(err, PlacementError::Io(_)));
}

#[test]
fn test_assignment_roundtrip_through_file() {
    let students = read_students(Cursor::new(STUDENTS)).unwrap();
    let classes = read_classes(Cursor::new(CLASSES)).unwrap();
    let mut r = Roster::new(students, classes, vocabulary()).unwrap();
    place(&mut r, "S1", "6A");
    place(&mut r, "S2", "6B");

    let dir = tempdir().unwrap();
    let path = dir.path().join("assignment.csv");
    save_assignment(&path, &r).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("student_id,class"));

    let pairs = read_assignment(fs::File::open(&path).unwrap()).unwrap();
    let mut copy = r.clone();
    place(&mut copy, "S3", "6A");
    apply_assignment(&mut copy, &pairs).unwrap();

    assert_eq!(copy.assignment(), r.assignment());
    assert_eq!(class_of(&copy, "S3"), None);
}

#[test]
fn test_write_assignment_skips_unplaced() {
    let students = read_students(Cursor::new(STUDENTS)).unwrap();
    let classes = read_classes(Cursor::new(CLASSES)).unwrap();
    let mut r = Roster::new(students, classes, vocabulary()).unwrap();
    place(&mut r, "S2", "6B");

    let mut out = Vec::new();
    write_assignment(&mut out, &r).unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "student_id,class\nS2,6B\n");
}

#[test]
fn test_apply_assignment_rejects_unknown_names() {
    let students = read_students(Cursor::new(STUDENTS)).unwrap();
    let classes = read_classes(Cursor::new(CLASSES)).unwrap();
    let mut r = Roster::new(students, classes, vocabulary()).unwrap();

    let unknown_student = vec![("S9".to_string(), "6A".to_string())];
    assert!(apply_assignment(&mut r, &unknown_student).is_err());

    let unknown_class = vec![("S1".to_string(), "9Z".to_string())];
    assert!(apply_assignment(&mut r, &unknown_class).is_err());
}
