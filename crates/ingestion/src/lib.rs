//! # Ingestion Pipeline
//!
//! Camera data ingestion module.
//!
//! Responsibilities:
//! - Register one `SensorSource` per camera of the operator rig
//! - Push every delivered `SensorPacket` into that camera's own queue
//! - Hand the queues to the synchronizer in registration (rig) order
//! - Stop every source when the pipeline is stopped or dropped
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::IngestionPipeline;
//!
//! let mut pipeline = IngestionPipeline::new();
//! let source = client.sensor_source(actor_id, "rgb".into(), modality).unwrap();
//! pipeline.register_sensor_source(source)?;
//!
//! pipeline.start_all();
//! for queue in pipeline.queues() {
//!     let packet = queue.recv().await?;
//! }
//! ```

mod error;
mod stats;
mod pipeline;

pub use contracts::SensorPacket;
pub use error::{IngestionError, Result};
pub use stats::{IngestionMetrics, MetricsSnapshot};
pub use pipeline::{CameraQueue, IngestionPipeline};
