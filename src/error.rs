use thiserror::Error;

use crate::breakeven::SolverError;

pub type Result<T, E = LcoxError> = std::result::Result<T, E>;

/// Errors surfaced by the capacity, cost and finance stages and by the
/// orchestrator that sequences them. None of them is recovered internally.
#[derive(Debug, Error)]
pub enum LcoxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Could not resolve {kind} model `{name}`: {reason}")]
    Resolution {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("Schedule `{schedule}` has no value for year {year}")]
    MissingScheduleYear { schedule: String, year: i32 },

    #[error("Breakeven solver failed: {0}")]
    Solver(#[from] SolverError),

    #[error("External model `{name}` failed: {source}")]
    ExternalModel {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LcoxError {
    /// Short machine-readable category, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            LcoxError::Config(_) => "config",
            LcoxError::Validation(_) => "validation",
            LcoxError::Consistency(_) => "consistency",
            LcoxError::Resolution { .. } => "resolution",
            LcoxError::MissingScheduleYear { .. } => "missing_schedule_year",
            LcoxError::Solver(_) => "solver",
            LcoxError::ExternalModel { .. } => "external_model",
            LcoxError::Io(_) => "io",
            LcoxError::Serialization(_) => "serialization",
        }
    }

    /// Whether the failure stems from the inputs rather than from a stage.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LcoxError::Config(_)
                | LcoxError::Validation(_)
                | LcoxError::Consistency(_)
                | LcoxError::MissingScheduleYear { .. }
        )
    }
}

impl From<validator::ValidationErrors> for LcoxError {
    fn from(errors: validator::ValidationErrors) -> Self {
        LcoxError::Validation(errors.to_string())
    }
}

impl From<serde_json::Error> for LcoxError {
    fn from(error: serde_json::Error) -> Self {
        LcoxError::Serialization(error.to_string())
    }
}

impl From<serde_yaml::Error> for LcoxError {
    fn from(error: serde_yaml::Error) -> Self {
        LcoxError::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for LcoxError {
    fn from(error: toml::de::Error) -> Self {
        LcoxError::Serialization(error.to_string())
    }
}
