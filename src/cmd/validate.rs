use crate::reports;
use clap::Args;
use classforge::api::audit_assignment;
use classforge::config::Config;
use classforge::roster::loader::{apply_assignment, read_assignment};
use classforge::roster::Roster;
use classforge::scorer::Scorer;
use classforge::PlResult;
use std::fs::File;

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: Config,

    /// `student_id,class` file produced by `place`.
    #[arg(short, long)]
    pub assignment: String,
}

/// Exit code 1 when any separation violation is found.
pub fn run(args: &ValidateArgs, config: Config, mut roster: Roster) -> PlResult<i32> {
    let pairs = read_assignment(File::open(&args.assignment)?)?;
    apply_assignment(&mut roster, &pairs)?;

    let audit = audit_assignment(&roster);
    let scorer = Scorer::new(&roster, config.weights, &config.balance);

    println!("\n=== ASSIGNMENT AUDIT: {} ===", args.assignment);
    reports::print_class_summary(&roster, &scorer);
    reports::print_audit(&audit);
    println!("Score: {:.4}", scorer.score_roster(&roster));

    Ok(if audit.separation_violations.is_empty() { 0 } else { 1 })
}
