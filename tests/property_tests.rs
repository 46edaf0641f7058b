mod common;

use classforge::api::{audit_assignment, PlacementEngine};
use classforge::dispatch::dispatch;
use classforge::events::NullSink;
use classforge::roster::checks::quota_overruns;
use classforge::roster::{ClassSlot, ConflictKind, Gender, Roster, Scores, Student};
use common::*;
use proptest::prelude::*;

// --- STRATEGIES ---

prop_compose! {
    fn arb_scores()(v in proptest::collection::vec(1.0..=4.0f32, 4)) -> Scores {
        Scores {
            communication: v[0],
            work: v[1],
            participation: v[2],
            absence: v[3],
        }
    }
}

prop_compose! {
    fn arb_student()(
        female in any::<bool>(),
        scores in arb_scores(),
        language in 0u8..3,
        group in proptest::option::weighted(0.2, 0u8..4),
        separation in proptest::option::weighted(0.2, 0u8..3),
    ) -> Student {
        let gender = if female { Gender::Female } else { Gender::Male };
        let mut s = Student::new("", gender).with_scores(scores);
        s = match language {
            0 => s,
            1 => s.with_language("ANG"),
            _ => s.with_language("ITA"),
        };
        if let Some(g) = group {
            s = s.with_group(&format!("G{}", g));
        }
        if let Some(d) = separation {
            s = s.with_separation(&format!("D{}", d));
        }
        s
    }
}

prop_compose! {
    fn arb_roster()(
        mut students in proptest::collection::vec(arb_student(), 6..40),
        num_classes in 2usize..5,
    ) -> Roster {
        for (i, s) in students.iter_mut().enumerate() {
            s.id = format!("P{:02}", i);
        }
        // Two ITA carriers at least, so the ITA quota below is never zero.
        for s in students.iter_mut().take(2) {
            s.attributes.language = Some("ITA".to_string());
        }
        let ita = students
            .iter()
            .filter(|s| s.attributes.language.as_deref() == Some("ITA"))
            .count() as u32;

        let target = students.len().div_ceil(num_classes) + 1;
        let classes: Vec<ClassSlot> = (0..num_classes)
            .map(|c| {
                let slot = class(&format!("C{}", c), target);
                if c < 2 { slot.with_quota("ITA", ita / 2) } else { slot }
            })
            .collect();
        roster(students, classes)
    }
}

fn tiny_config() -> classforge::Config {
    let mut config = fast_config();
    config.search.max_iterations = 60;
    config.search.greedy_iterations = 20;
    config.search.three_way_attempts = 20;
    config.search.max_restarts = 2;
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_dispatch_respects_quotas(mut r in arb_roster()) {
        dispatch(&mut r, &NullSink);
        prop_assert!(quota_overruns(&r).is_empty());
    }

    #[test]
    fn test_every_student_is_placed(mut r in arb_roster()) {
        let n = r.students.len();
        let outcome = PlacementEngine::new(tiny_config()).run(&mut r).unwrap();
        prop_assert_eq!(outcome.assignment.len(), n);
        prop_assert!(r.unassigned().is_empty());
    }

    #[test]
    fn test_violations_are_always_reported(mut r in arb_roster()) {
        let outcome = PlacementEngine::new(tiny_config()).run(&mut r).unwrap();
        let reported = outcome
            .report
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::UnresolvedSeparation);
        prop_assert!(outcome.report.separation_violations.is_empty() || reported);
    }

    #[test]
    fn test_split_cohorts_are_always_reported(mut r in arb_roster()) {
        let outcome = PlacementEngine::new(tiny_config()).run(&mut r).unwrap();
        let audit = audit_assignment(&r);
        let reported = outcome
            .report
            .conflicts
            .iter()
            .any(|c| matches!(c.kind, ConflictKind::SplitCohort | ConflictKind::InfeasibleCohort));
        prop_assert!(audit.split_cohorts.is_empty() || reported);
    }

    #[test]
    fn test_score_never_increases(mut r in arb_roster()) {
        let outcome = PlacementEngine::new(tiny_config()).run(&mut r).unwrap();
        prop_assert!(outcome.score_after.is_finite());
        prop_assert!(outcome.score_after <= outcome.score_before + 1e-3);
    }
}
