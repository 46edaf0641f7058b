use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use classforge::config::{Config, ScoringWeights};
use classforge::roster::loader::load_roster;
use classforge::roster::Vocabulary;
use std::process;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, long, default_value = "data/students.csv")]
    students: String,

    #[arg(global = true, long, default_value = "data/classes.csv")]
    classes: String,

    /// JSON file holding a complete configuration.
    #[arg(global = true, long)]
    config_file: Option<String>,

    /// JSON file holding scoring weights; flags typed on the command line still win.
    #[arg(global = true, long)]
    weights: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Place(cmd::place::PlaceArgs),
    Validate(cmd::validate::ValidateArgs),
}

fn main() {
    // Raw matches tell user input apart from defaults
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (cli_config, sub_matches) = match &cli.command {
        Commands::Place(args) => (&args.config, matches.subcommand_matches("place")),
        Commands::Validate(args) => (&args.config, matches.subcommand_matches("validate")),
    };
    let config = resolve_config(&cli, cli_config, sub_matches).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(2);
    });

    let vocabulary = Vocabulary::from_definitions(&config.defs);
    let roster = load_roster(&cli.students, &cli.classes, vocabulary).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(2);
    });

    let code = match &cli.command {
        Commands::Place(args) => cmd::place::run(args, config, roster),
        Commands::Validate(args) => cmd::validate::run(args, config, roster),
    };
    match code {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    }
}

/// Command-line config, replaced by `--config-file` when given, with `--weights` layered on
/// top. Weight flags typed explicitly always win.
fn resolve_config(
    cli: &Cli,
    cli_config: &Config,
    sub_matches: Option<&ArgMatches>,
) -> classforge::PlResult<Config> {
    let mut config = match &cli.config_file {
        Some(path) => {
            info!("Loading configuration from {}", path);
            Config::load_from_file(path)?
        }
        None => cli_config.clone(),
    };

    if let Some(path) = &cli.weights {
        info!("Loading weights from {}", path);
        config.weights = ScoringWeights::load_from_file(path)?;
    }

    if cli.config_file.is_some() || cli.weights.is_some() {
        if let Some(m) = sub_matches {
            config.weights.merge_from_cli(&cli_config.weights, m);
        }
    }
    Ok(config)
}
