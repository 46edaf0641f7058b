use crate::reports;
use clap::Args;
use classforge::api::PlacementEngine;
use classforge::config::Config;
use classforge::events::TracingSink;
use classforge::roster::loader::save_assignment;
use classforge::roster::Roster;
use classforge::scorer::Scorer;
use classforge::PlResult;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct PlaceArgs {
    #[command(flatten)]
    pub config: Config,

    /// Where to write the `student_id,class` assignment.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print the full outcome as JSON instead of tables.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &PlaceArgs, config: Config, mut roster: Roster) -> PlResult<i32> {
    let engine = PlacementEngine::new(config).with_sink(Arc::new(TracingSink));
    let outcome = engine.run(&mut roster)?;

    if let Some(path) = &args.output {
        save_assignment(path, &roster)?;
        info!("Assignment written to {}", path);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(0);
    }

    let scorer = Scorer::new(&roster, engine.config().weights.clone(), &engine.config().balance);
    reports::print_phase_counts(&outcome.counts, &outcome.mobility);
    reports::print_class_summary(&roster, &scorer);
    reports::print_restarts(&outcome.restarts);
    reports::print_conflicts(&outcome.report.conflicts);
    reports::print_violations(&outcome.report.separation_violations);
    println!("Optimizer: {:?}", outcome.report.optimizer);
    println!("Score before optimization: {:.4}", outcome.score_before);
    println!("Score: {:.4}", outcome.score_after);
    Ok(0)
}
