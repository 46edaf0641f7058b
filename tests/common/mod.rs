#![allow(dead_code)]

use classforge::config::Config;
use classforge::events::{EventSink, PlacementEvent};
use classforge::roster::{ClassSlot, Gender, Roster, Student, Vocabulary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub fn vocabulary() -> Vocabulary {
    Vocabulary::new(["ANG", "ALL", "ESP", "ITA"], ["LATIN", "GREC"]).with_universal(["ANG"])
}

pub fn female(id: &str) -> Student {
    Student::new(id, Gender::Female)
}

pub fn male(id: &str) -> Student {
    Student::new(id, Gender::Male)
}

pub fn class(name: &str, target: usize) -> ClassSlot {
    ClassSlot::new(name, target, target + 2)
}

pub fn roster(students: Vec<Student>, classes: Vec<ClassSlot>) -> Roster {
    Roster::new(students, classes, vocabulary()).expect("valid test roster")
}

/// Puts student `id` into class `name`.
pub fn place(roster: &mut Roster, id: &str, name: &str) {
    let si = roster.index_of(id).expect("known student");
    let ci = roster.class_by_name(name).expect("known class");
    roster.students[si].assigned = Some(ci);
}

pub fn class_of(roster: &Roster, id: &str) -> Option<String> {
    let si = roster.index_of(id)?;
    roster.students[si]
        .assigned
        .map(|c| roster.classes[c].name.clone())
}

pub fn gender_count(roster: &Roster, name: &str) -> (usize, usize) {
    let ci = roster.class_by_name(name).expect("known class");
    let members = roster.members(ci);
    let f = members
        .iter()
        .filter(|&&i| roster.students[i].gender == Gender::Female)
        .count();
    (f, members.len() - f)
}

/// Small search budget, sequential restarts.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.search.max_iterations = 150;
    config.search.patience = 60;
    config.search.greedy_iterations = 40;
    config.search.three_way_attempts = 40;
    config.search.max_restarts = 3;
    config.search.parallel = false;
    config
}

/// Sink that keeps every event and can request cancellation.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<PlacementEvent>>,
    pub cancel: AtomicBool,
}

impl RecordingSink {
    pub fn cancelled() -> Self {
        let sink = Self::default();
        sink.cancel.store(true, Ordering::SeqCst);
        sink
    }

    pub fn events(&self) -> Vec<PlacementEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &PlacementEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// A mid-size school: 4 classes, 80 students, mixed languages, options and codes.
pub fn school() -> Roster {
    let classes = vec![
        class("6A", 20).with_quota("ANG", 20).with_quota("ESP", 10).with_quota("LATIN", 3),
        class("6B", 20)
            .with_quota("ANG", 20)
            .with_quota("ESP", 10)
            .with_quota("ITA", 6)
            .with_quota("LATIN", 2),
        class("6C", 20).with_quota("ANG", 20).with_quota("ALL", 5).with_quota("ITA", 4),
        class("6D", 20).with_quota("ANG", 20).with_quota("ALL", 5).with_quota("LATIN", 3),
    ];

    let students = (0..80)
        .map(|i| {
            let id = format!("S{:02}", i);
            let mut s = if i % 5 < 3 { female(&id) } else { male(&id) };
            s.scores = classforge::roster::Scores {
                communication: 1.0 + (i * 7 % 13) as f32 / 4.0,
                work: 1.0 + (i * 5 % 13) as f32 / 4.0,
                participation: 1.0 + (i * 3 % 13) as f32 / 4.0,
                absence: 1.0 + (i * 11 % 13) as f32 / 4.0,
            };
            s = match i % 8 {
                0 | 1 => s.with_language("ESP"),
                2 => s.with_language("ITA"),
                3 => s.with_language("ALL"),
                _ => s.with_language("ANG"),
            };
            if i % 10 == 4 {
                s = s.with_option("LATIN");
            }
            if i < 6 {
                s = s.with_group(if i < 3 { "G1" } else { "G2" });
            }
            if (20..24).contains(&i) {
                s = s.with_separation("D1");
            }
            if (40..43).contains(&i) {
                s = s.with_separation("D2");
            }
            s
        })
        .collect();

    roster(students, classes)
}
