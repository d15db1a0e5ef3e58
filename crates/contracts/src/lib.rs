//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the recorder:
//! geometry, scenario rows, camera packets, spawn commands, actor state and
//! the sink trait. Business crates depend on this crate only, never on each
//! other's internals.
//!
//! ## Time Model
//! - The simulator's frame id (`FrameId`) is the primary clock. Every tick
//!   and every sensor payload produced during it carry the same id.
//! - `timestamp` (simulation seconds) is kept for diagnostics only.

mod actor;
mod blueprint;
mod command;
mod error;
mod geometry;
mod runtime;
mod scenario;
mod sensor;
mod sensor_id;
mod sensor_source;
mod settings;
mod sink;
mod sync;

pub use actor::*;
pub use blueprint::*;
pub use command::*;
pub use error::*;
pub use geometry::*;
pub use runtime::*;
pub use scenario::*;
pub use sensor::*;
pub use sensor_id::SensorId;
pub use sensor_source::{SensorDataCallback, SensorSource};
pub use settings::*;
pub use sink::*;
pub use sync::*;
