// Error taxonomy shared by the optimizer and simulator.

use std::path::PathBuf;

use thiserror::Error;

use crate::player::PlayerId;

// ---------------------------------------------------------------------------
// Data errors (malformed or missing player fields)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DataError {
    #[error("row {row}: missing required field `{field}`")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid value {value:?} for field `{field}`")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("duplicate player id {0}")]
    DuplicateId(PlayerId),

    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("player pool is empty: {0}")]
    Empty(String),
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("invalid config field `{field}`: {message}")]
    Config { field: String, message: String },

    #[error("rule validation failed: {0}")]
    RuleValidation(String),

    #[error("no feasible lineup satisfies the configured constraints")]
    NoFeasibleLineup,

    #[error("field generation failed: {0}")]
    FieldGeneration(String),

    #[error("solver backend error: {0}")]
    Solver(String),

    #[error("run cancelled before any unit of work completed")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable category name reported alongside the message at the boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Data(_) => "DataError",
            Error::Config { .. } => "ConfigError",
            Error::RuleValidation(_) => "RuleValidationError",
            Error::NoFeasibleLineup => "NoFeasibleLineupError",
            Error::FieldGeneration(_) => "FieldGenerationError",
            Error::Solver(_) => "SolverError",
            Error::Cancelled => "Cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_taxonomy() {
        assert_eq!(Error::NoFeasibleLineup.kind(), "NoFeasibleLineupError");
        assert_eq!(Error::config("field_size", "must be > 0").kind(), "ConfigError");
        assert_eq!(
            Error::from(DataError::DuplicateId(PlayerId(7))).kind(),
            "DataError"
        );
    }

    #[test]
    fn config_error_message_names_field() {
        let err = Error::config("num_simulations", "must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid config field `num_simulations`: must be > 0"
        );
    }
}
