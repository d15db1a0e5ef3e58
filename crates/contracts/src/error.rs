//! Layered error definitions
//!
//! Categorized by source: config / simulator / sync / sink

use thiserror::Error;

use crate::FrameId;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Scenario table parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Scenario row validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Simulator Errors =====
    /// Simulator connection error
    #[error("simulator connection error: {message}")]
    SimulatorConnection { message: String },

    /// Spawn error
    #[error("spawn error for '{blueprint}': {message}")]
    Spawn { blueprint: String, message: String },

    /// Actor not found
    #[error("actor not found: {actor_id}")]
    ActorNotFound { actor_id: u32 },

    /// Unknown map
    #[error("map '{map}' is not available on the server")]
    UnknownMap { map: String },

    // ===== Sync Errors =====
    /// A camera did not deliver the tick's frame in time
    #[error("sync timeout: sensor '{sensor_id}' did not deliver frame {frame} within {waited_ms}ms")]
    SyncTimeout {
        sensor_id: String,
        frame: FrameId,
        waited_ms: u64,
    },

    /// Delivered frames do not agree with the tick
    #[error("frame mismatch: tick {expected}, sensor '{sensor_id}' delivered {actual}")]
    FrameMismatch {
        sensor_id: String,
        expected: FrameId,
        actual: FrameId,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create spawn error
    pub fn spawn(blueprint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spawn {
            blueprint: blueprint.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
