use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {}", .0.join("; "))]
    Configuration(Vec<String>),

    #[error("Roster contains no students")]
    EmptyRoster,

    #[error("Class structure contains no classes")]
    EmptyClasses,

    #[error("Data Validation Error: {0}")]
    Validation(String),

    #[error("No valid restart: all {restarts} restarts ended with a separation violation")]
    NoValidRestart { restarts: usize },

    #[error("Run cancelled")]
    Cancelled,
}

impl PlacementError {
    pub fn config(msg: impl Into<String>) -> Self {
        PlacementError::Configuration(vec![msg.into()])
    }
}

pub type PlResult<T> = Result<T, PlacementError>;
