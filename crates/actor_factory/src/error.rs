//! Actor Factory error types

use contracts::{ActorId, ContractError};
use thiserror::Error;

/// Simulator client / actor factory error
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// Connection error
    #[error("failed to connect to simulator: {message}")]
    ConnectionFailed { message: String },

    /// Map not available on the server
    #[error("map '{map}' is not available")]
    UnknownMap { map: String },

    /// Blueprint not in the library
    #[error("blueprint '{id}' not found")]
    BlueprintNotFound { id: String },

    /// Actor does not exist (or is of the wrong kind)
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: ActorId },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// Any other server-side failure
    #[error("simulator error: {message}")]
    Simulator { message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ActorFactoryError {
    pub fn not_connected() -> Self {
        Self::ConnectionFailed {
            message: "not connected".into(),
        }
    }

    pub fn simulator(message: impl Into<String>) -> Self {
        Self::Simulator {
            message: message.into(),
        }
    }
}

impl From<ActorFactoryError> for ContractError {
    fn from(err: ActorFactoryError) -> Self {
        match err {
            ActorFactoryError::Contract(e) => e,
            ActorFactoryError::ConnectionFailed { message } => {
                ContractError::SimulatorConnection { message }
            }
            ActorFactoryError::UnknownMap { map } => ContractError::UnknownMap { map },
            ActorFactoryError::BlueprintNotFound { id } => {
                ContractError::spawn(id, "blueprint not found")
            }
            ActorFactoryError::ActorNotFound { actor_id } => {
                ContractError::ActorNotFound { actor_id }
            }
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
