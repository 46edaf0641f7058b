use regex::Regex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    students_path: PathBuf,
    classes_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let students_path = dir.path().join("students.csv");
        let classes_path = dir.path().join("classes.csv");

        let mut students = File::create(&students_path).unwrap();
        writeln!(
            students,
            "id,last_name,first_name,gender,communication,work,participation,absence,language,option,group_code,separation_code"
        )
        .unwrap();
        for i in 0..24 {
            let gender = if i % 2 == 0 { "F" } else { "M" };
            let language = match i % 4 {
                0 => "ITA",
                1 => "ESP",
                _ => "ANG",
            };
            let group = if i == 5 || i == 9 { "G1" } else { "" };
            let separation = if i == 2 || i == 3 { "D1" } else { "" };
            let score = 1.0 + (i % 7) as f32 * 0.5;
            writeln!(
                students,
                "S{:02},Last{},First{},{},{},{},{},{},{},,{},{}",
                i,
                i,
                i,
                gender,
                score,
                4.0 - (i % 5) as f32 * 0.5,
                score.min(3.0),
                2.5,
                language,
                group,
                separation
            )
            .unwrap();
        }

        let mut classes = File::create(&classes_path).unwrap();
        writeln!(classes, "name,target_size,capacity,quotas").unwrap();
        writeln!(classes, "6A,8,10,ITA:3;ESP:2").unwrap();
        writeln!(classes, "6B,8,10,ITA:3;ESP:2").unwrap();
        writeln!(classes, "6C,8,10,ESP:2").unwrap();

        Self {
            dir,
            students_path,
            classes_path,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        let mut all: Vec<&str> = args.to_vec();
        all.extend_from_slice(&[
            "--students",
            self.students_path.to_str().unwrap(),
            "--classes",
            self.classes_path.to_str().unwrap(),
        ]);
        Command::new(env!("CARGO_BIN_EXE_classforge"))
            .args(&all)
            .output()
            .expect("Failed to execute binary")
    }

    fn place(&self, output: &Path, extra: &[&str]) -> Output {
        let mut args = vec![
            "place",
            "-o",
            output.to_str().unwrap(),
            "--max-restarts",
            "2",
            "--max-iterations",
            "100",
            "--parallel",
            "false",
        ];
        args.extend_from_slice(extra);
        self.run(&args)
    }
}

fn final_score(stdout: &str) -> Option<f32> {
    let re = Regex::new(r"(?m)^Score: (\d+\.\d+)").unwrap();
    re.captures(stdout).and_then(|c| c[1].parse().ok())
}

#[test]
fn test_cli_place_writes_assignment() {
    let ctx = TestContext::new();
    let out = ctx.path("assignment.csv");

    let output = ctx.place(&out, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let score = final_score(&stdout).expect("final score line");
    assert!(score >= 0.0);

    let text = fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("student_id,class"));
    assert_eq!(lines.count(), 24);
}

#[test]
fn test_cli_validate_accepts_own_output() {
    let ctx = TestContext::new();
    let out = ctx.path("assignment.csv");
    assert!(ctx.place(&out, &[]).status.success());

    let output = ctx.run(&["validate", "-a", out.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0), "stdout: {}", stdout);
    assert!(stdout.contains("Separation violations: none"));
    assert!(final_score(&stdout).is_some());
}

#[test]
fn test_cli_validate_flags_separation_violation() {
    let ctx = TestContext::new();
    let out = ctx.path("crafted.csv");
    let mut f = File::create(&out).unwrap();
    writeln!(f, "student_id,class").unwrap();
    writeln!(f, "S02,6C").unwrap();
    writeln!(f, "S03,6C").unwrap();
    drop(f);

    let output = ctx.run(&["validate", "-a", out.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("D1"));
    assert!(stdout.contains("Unassigned"));
}

#[test]
fn test_cli_json_output_parses() {
    let ctx = TestContext::new();
    let out = ctx.path("assignment.csv");

    let output = ctx.place(&out, &["--json"]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON on stdout");
    assert_eq!(value["assignment"].as_object().map(|m| m.len()), Some(24));
    assert!(value["report"]["separation_violations"].as_array().is_some());
    assert!(value["score_after"].as_f64().is_some());
}

#[test]
fn test_cli_same_seed_same_assignment() {
    let ctx = TestContext::new();
    let a = ctx.path("a.csv");
    let b = ctx.path("b.csv");

    assert!(ctx.place(&a, &["--seed", "9"]).status.success());
    assert!(ctx.place(&b, &["--seed", "9"]).status.success());

    assert_eq!(fs::read_to_string(a).unwrap(), fs::read_to_string(b).unwrap());
}

#[test]
fn test_cli_bad_input_exits_with_two() {
    let ctx = TestContext::new();
    fs::write(&ctx.classes_path, "name,target_size,capacity,quotas\n6A,8,10,KLINGON:2\n").unwrap();

    let output = ctx.place(&ctx.path("x.csv"), &[]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_quota_above_supply_exits_with_two() {
    let ctx = TestContext::new();
    fs::write(&ctx.classes_path, "name,target_size,capacity,quotas\n6A,12,14,ITA:9\n6B,12,14,ESP:6\n").unwrap();

    let output = ctx.place(&ctx.path("x.csv"), &[]);

    assert_eq!(output.status.code(), Some(2));
}
