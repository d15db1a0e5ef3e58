//! # Actor Factory
//!
//! Simulator access and actor lifecycle for the recorder.
//!
//! Responsibilities:
//! - Abstract the simulator behind `SimulatorClient`
//! - Spawn actors in batches, pairing every response with its request
//! - Tear down everything a session spawned, logging failures
//! - Provide camera `SensorSource`s for the ingestion queues
//! - Ship an in-process `MockSimulator` for tests and dry runs
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod client;
pub mod error;
pub mod factory;
pub mod mock_client;
pub mod mock_sensor;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;
#[cfg(feature = "real-carla")]
pub mod sensor_data_converter;

pub use client::{SimulatorClient, Snapshot, VehicleStatus};
pub use contracts::{ActorId, SensorSource, WorldRoster};
pub use error::{ActorFactoryError, Result};
pub use factory::{ActorFactory, SpawnOutcome, TeardownReport};
pub use mock_client::{MockConfig, MockSimulator, MOCK_MAPS};
pub use mock_sensor::{CameraFeed, MockCamera};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::CarlaSensorSource;
