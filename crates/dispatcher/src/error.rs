//! Dispatcher error types

use std::path::PathBuf;

use contracts::{ContractError, SensorId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatcherError>;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Sink worker is gone
    #[error("sink '{sink_name}' is closed, frame {frame} not delivered")]
    SinkClosed { sink_name: String, frame: u64 },

    /// Camera payload cannot be turned into an image
    #[error("cannot encode frame {frame} of camera '{sensor_id}': {message}")]
    Encode {
        sensor_id: SensorId,
        frame: u64,
        message: String,
    },

    /// Image file error
    #[error("image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// CSV table error
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Sample info YAML error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Attribute column error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn encode(sensor_id: &SensorId, frame: u64, message: impl Into<String>) -> Self {
        Self::Encode {
            sensor_id: sensor_id.clone(),
            frame,
            message: message.into(),
        }
    }
}

impl From<DispatcherError> for ContractError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::Contract(inner) => inner,
            DispatcherError::Io(inner) => ContractError::Io(inner),
            other => ContractError::Other(other.to_string()),
        }
    }
}
