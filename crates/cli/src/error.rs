//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Parameter file not found
    #[error("Parameter file not found: {path}")]
    ParamsNotFound { path: PathBuf },

    /// Scenario table error
    #[error("Scenario table error: {0}")]
    Scenario(#[from] scenario_loader::ScenarioError),

    /// Simulator connection error
    #[error("Failed to connect to CARLA server at {host}:{port}: {message}")]
    SimulatorConnection {
        host: String,
        port: u16,
        message: String,
    },

    /// Simulator request error
    #[error("Simulator error: {0}")]
    Simulator(#[from] actor_factory::ActorFactoryError),

    /// World session error
    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    /// Writer error
    #[error("Writer error: {0}")]
    Dispatcher(#[from] dispatcher::DispatcherError),

    /// Command-line value out of range
    #[error("Invalid value for --{name}: {message}")]
    InvalidArgument { name: &'static str, message: String },

    /// Not every frame of a sample reached the disk
    #[error("Sample {hash} is incomplete: {written} of {expected} frames written")]
    IncompleteSample {
        hash: String,
        written: u64,
        expected: u64,
    },

    /// Ctrl+C or SIGTERM during a sample
    #[error("Interrupted")]
    Interrupted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn simulator_connection(host: impl Into<String>, port: u16, message: impl Into<String>) -> Self {
        Self::SimulatorConnection {
            host: host.into(),
            port,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
