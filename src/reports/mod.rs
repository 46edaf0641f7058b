use classforge::api::{AssignmentAudit, PhaseCounts};
use classforge::optimizer::runner::RestartSummary;
use classforge::roster::{Conflict, Roster, SeparationViolation};
use classforge::scorer::Scorer;
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::collections::BTreeMap;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn right_align(table: &mut Table, from: usize, to: usize) {
    for i in from..=to {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

pub fn print_phase_counts(counts: &PhaseCounts, mobility: &BTreeMap<String, usize>) {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Phase").add_attribute(Attribute::Bold),
        Cell::new("Step"),
        Cell::new("Count"),
    ]);
    let rows = [
        ("1", "dispatched", counts.dispatched),
        ("2", "grouped", counts.grouped),
        ("2", "separated", counts.separated),
        ("3", "rebalanced", counts.rebalanced),
        ("3", "completed", counts.completed),
        ("3", "parity swaps", counts.parity_swaps),
        ("4", "optimizer swaps", counts.optimizer_swaps),
        ("4", "valid restarts", counts.restarts_valid),
    ];
    for (phase, step, n) in rows {
        table.add_row(vec![Cell::new(phase), Cell::new(step), Cell::new(n)]);
    }
    right_align(&mut table, 2, 2);
    println!("\n{}", table);

    let labels: Vec<String> = mobility.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    println!("Mobility: {}", labels.join(", "));
}

pub fn print_class_summary(roster: &Roster, scorer: &Scorer) {
    let stats = scorer.class_stats(roster);
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Class").add_attribute(Attribute::Bold),
        Cell::new("Size"),
        Cell::new("Target"),
        Cell::new("Cap"),
        Cell::new("F"),
        Cell::new("M"),
        Cell::new("Heads").fg(Color::Green),
        Cell::new("Lows").fg(Color::Red),
        Cell::new("Avg"),
        Cell::new("Score").fg(Color::Cyan),
    ]);

    for (c, slot) in roster.classes.iter().enumerate() {
        let d = scorer.details(c, &stats[c]);
        let avg = d.averages.iter().sum::<f32>() / 4.0;
        let size = if d.size > slot.capacity {
            Cell::new(d.size).fg(Color::Red)
        } else {
            Cell::new(d.size)
        };
        table.add_row(vec![
            Cell::new(&slot.name).add_attribute(Attribute::Bold),
            size,
            Cell::new(slot.target_size),
            Cell::new(slot.capacity),
            Cell::new(d.female),
            Cell::new(d.male),
            Cell::new(d.heads).fg(Color::Green),
            Cell::new(d.lows).fg(Color::Red),
            Cell::new(format!("{:.2}", avg)),
            Cell::new(format!("{:.4}", d.total)).fg(Color::Cyan),
        ]);
    }
    right_align(&mut table, 1, 9);
    println!("\n{}", table);
}

pub fn print_restarts(restarts: &[RestartSummary]) {
    if restarts.is_empty() {
        return;
    }
    let mut table = new_table();
    table.set_header(vec!["Restart", "Seed", "Iterations", "Swaps", "Score", "Valid"]);
    for r in restarts {
        let valid = if r.valid {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(r.restart),
            Cell::new(r.seed),
            Cell::new(r.iterations),
            Cell::new(r.swaps),
            Cell::new(format!("{:.4}", r.score)),
            valid,
        ]);
    }
    right_align(&mut table, 0, 4);
    println!("\n{}", table);
}

pub fn print_conflicts(conflicts: &[Conflict]) {
    if conflicts.is_empty() {
        println!("\nNo conflicts.");
        return;
    }
    let mut table = new_table();
    table.set_header(vec!["Kind", "Class", "Students", "Detail"]);
    for c in conflicts {
        table.add_row(vec![
            Cell::new(c.kind).fg(Color::Yellow),
            Cell::new(c.class.as_deref().unwrap_or("-")),
            Cell::new(c.students.join(", ")),
            Cell::new(&c.detail),
        ]);
    }
    println!("\nConflicts ({}):\n{}", conflicts.len(), table);
}

pub fn print_violations(violations: &[SeparationViolation]) {
    if violations.is_empty() {
        println!("Separation violations: none");
        return;
    }
    let mut table = new_table();
    table.set_header(vec!["Code", "Class", "Students"]);
    for v in violations {
        table.add_row(vec![
            Cell::new(&v.code).fg(Color::Red),
            Cell::new(&v.class),
            Cell::new(v.students.join(", ")),
        ]);
    }
    println!("\nSeparation violations ({}):\n{}", violations.len(), table);
}

pub fn print_audit(audit: &AssignmentAudit) {
    print_violations(&audit.separation_violations);

    for (code, classes) in &audit.split_cohorts {
        println!("Split grouping code {}: {}", code, classes.join(", "));
    }
    for q in &audit.quota_overruns {
        println!(
            "Quota overrun in {}: {} '{}' carriers for a quota of {}",
            q.class, q.placed, q.attribute, q.quota
        );
    }
    if !audit.unassigned.is_empty() {
        println!("Unassigned: {}", audit.unassigned.join(", "));
    }
    if audit.is_clean() {
        println!("Assignment is clean.");
    }
}
