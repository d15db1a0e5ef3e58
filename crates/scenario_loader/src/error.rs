//! Scenario table errors

use thiserror::Error;

use contracts::ContractError;

/// Scenario loader error
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// File could not be read or written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A row could not be turned into scenario parameters
    #[error("row {row}: {message}")]
    Parse { row: usize, message: String },

    /// A row parsed but violates a constraint
    #[error("row {row}, field '{field}': {message}")]
    Validation {
        row: usize,
        field: String,
        message: String,
    },

    /// Requested rows do not exist
    #[error("invalid row range: {0}")]
    RowRange(String),

    /// Generator configuration is unusable
    #[error("generator error: {0}")]
    Generator(String),
}

impl ScenarioError {
    pub fn validation(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ScenarioError> for ContractError {
    fn from(err: ScenarioError) -> Self {
        match err {
            ScenarioError::Io(e) => ContractError::Io(e),
            ScenarioError::Validation {
                row,
                field,
                message,
            } => ContractError::config_validation(format!("row {row}.{field}"), message),
            other => ContractError::ConfigParse {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ScenarioError>;
