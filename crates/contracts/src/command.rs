//! Batched spawn commands
//!
//! A batch is executed by the simulator as one request and answered with
//! exactly one `CommandResponse` per `SpawnCommand`, in order.

use serde::{Deserialize, Serialize};

use crate::{ActorId, Blueprint, Transform};

/// Spawn one actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnCommand {
    pub blueprint: Blueprint,

    /// World transform, or relative to `parent` when attached
    pub transform: Transform,

    /// Parent actor for attached actors (cameras, walker controllers)
    pub parent: Option<ActorId>,

    /// Hand the vehicle to the traffic manager on this port once spawned
    pub autopilot: Option<u16>,
}

impl SpawnCommand {
    pub fn new(blueprint: Blueprint, transform: Transform) -> Self {
        Self {
            blueprint,
            transform,
            parent: None,
            autopilot: None,
        }
    }

    /// Attach to a parent actor
    pub fn attached_to(mut self, parent: ActorId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Enable autopilot once spawned
    pub fn with_autopilot(mut self, tm_port: u16) -> Self {
        self.autopilot = Some(tm_port);
        self
    }
}

/// Result of one command of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub actor_id: Option<ActorId>,
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn spawned(actor_id: ActorId) -> Self {
        Self {
            actor_id: Some(actor_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            actor_id: None,
            error: Some(error.into()),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// `Ok(actor_id)` on success, `Err(message)` otherwise
    pub fn into_result(self) -> Result<ActorId, String> {
        match (self.actor_id, self.error) {
            (_, Some(error)) => Err(error),
            (Some(actor_id), None) => Ok(actor_id),
            (None, None) => Err("no actor id in response".to_string()),
        }
    }
}
