use crate::error::PlResult;
use clap::{parser::ValueSource, ArgAction, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub search: SearchParams,
    #[command(flatten)]
    pub weights: ScoringWeights,
    #[command(flatten)]
    pub balance: BalanceParams,
    #[command(flatten)]
    pub defs: AttributeDefinitions,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    #[arg(long, default_value_t = 2000)]
    pub max_iterations: usize,
    #[arg(long, default_value_t = 5)]
    pub max_restarts: usize,
    #[arg(short = 'S', long, default_value_t = 42)]
    pub seed: u64,
    /// Consecutive non-improving iterations before a restart stops.
    #[arg(long, default_value_t = 300)]
    pub patience: usize,
    /// Upper bound on student pairs examined per iteration.
    #[arg(long, default_value_t = 400)]
    pub max_candidates: usize,
    #[arg(long, default_value_t = 0.3)]
    pub partner_random_rate: f32,
    #[arg(long, default_value_t = 300)]
    pub greedy_iterations: usize,
    #[arg(long, default_value_t = 500)]
    pub three_way_attempts: usize,
    #[arg(long, default_value_t = 30)]
    pub recent_window: usize,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub parallel: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            max_restarts: 5,
            seed: 42,
            patience: 300,
            max_candidates: 400,
            partner_random_rate: 0.3,
            greedy_iterations: 300,
            three_way_attempts: 500,
            recent_window: 30,
            parallel: true,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    // === CLASS SCORE ===
    #[arg(long, default_value_t = 3.0)]
    pub weight_parity: f32,
    #[arg(long, default_value_t = 4.0)]
    pub weight_academic: f32,
    #[arg(long, default_value_t = 2.0)]
    pub weight_profile: f32,
    #[arg(long, default_value_t = 10.0)]
    pub weight_grouping: f32,
    #[arg(long, default_value_t = 0.05)]
    pub penalty_oscillation: f32,

    // === ANNEALING ===
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub annealing: bool,
    #[arg(long, default_value_t = 1.0)]
    pub temp_initial: f32,
    #[arg(long, default_value_t = 0.995)]
    pub cooling_rate: f32,
    #[arg(long, default_value_t = 0.01)]
    pub temp_min: f32,
    #[arg(long, default_value_t = 0.5)]
    pub max_degradation: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            weight_parity: 3.0,
            weight_academic: 4.0,
            weight_profile: 2.0,
            weight_grouping: 10.0,
            penalty_oscillation: 0.05,
            annealing: true,
            temp_initial: 1.0,
            cooling_rate: 0.995,
            temp_min: 0.01,
            max_degradation: 0.5,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceParams {
    /// Largest accepted |female - male| gap inside a class.
    #[arg(long, default_value_t = 2)]
    pub parity_tolerance: u32,
    #[arg(long, default_value_t = 200)]
    pub max_parity_passes: usize,
    #[arg(long, default_value_t = 1.0)]
    pub weight_capacity: f32,
    #[arg(long, default_value_t = 2.0)]
    pub weight_completion_academic: f32,
    #[arg(long, default_value_t = 1.0)]
    pub weight_completion_parity: f32,
    /// Profile average at or above which a student counts as a head of class.
    #[arg(long, default_value_t = 3.25)]
    pub head_threshold: f32,
    /// Profile average at or below which a student counts as a low performer.
    #[arg(long, default_value_t = 1.75)]
    pub low_threshold: f32,
}

impl Default for BalanceParams {
    fn default() -> Self {
        Self {
            parity_tolerance: 2,
            max_parity_passes: 200,
            weight_capacity: 1.0,
            weight_completion_academic: 2.0,
            weight_completion_parity: 1.0,
            head_threshold: 3.25,
            low_threshold: 1.75,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeDefinitions {
    #[arg(long, default_value = "ANG,ALL,ESP,ITA,CHI,POR")]
    pub languages: String,
    #[arg(long, default_value = "LATIN,GREC,EURO,CHAV")]
    pub options: String,
    /// Languages or options every class offers.
    #[arg(long, default_value = "ANG")]
    pub universal: String,
}

impl Default for AttributeDefinitions {
    fn default() -> Self {
        Self {
            languages: "ANG,ALL,ESP,ITA,CHI,POR".to_string(),
            options: "LATIN,GREC,EURO,CHAV".to_string(),
            universal: "ANG".to_string(),
        }
    }
}

impl AttributeDefinitions {
    pub fn get_languages(&self) -> Vec<String> {
        parse_list(&self.languages)
    }

    pub fn get_options(&self) -> Vec<String> {
        parse_list(&self.options)
    }

    pub fn get_universal(&self) -> Vec<String> {
        parse_list(&self.universal)
    }
}

impl ScoringWeights {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PlResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn merge_from_cli(&mut self, cli_weights: &ScoringWeights, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$field = cli_weights.$field;
                }
            };
        }

        update_if_present!(weight_parity);
        update_if_present!(weight_academic);
        update_if_present!(weight_profile);
        update_if_present!(weight_grouping);
        update_if_present!(penalty_oscillation);

        update_if_present!(annealing);
        update_if_present!(temp_initial);
        update_if_present!(cooling_rate);
        update_if_present!(temp_min);
        update_if_present!(max_degradation);
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PlResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Splits a comma list into trimmed, upper-cased, non-empty tokens.
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_ascii_uppercase())
        .filter(|p| !p.is_empty())
        .collect()
}
