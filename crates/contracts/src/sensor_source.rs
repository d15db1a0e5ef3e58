//! SensorSource trait - camera data source abstraction
//!
//! Decouples the ingestion queues from where camera frames come from: the
//! real simulator's sensor callbacks or the in-process mock.

use std::sync::Arc;

use crate::{CameraModality, SensorPacket};

/// Sensor data callback type
///
/// Invoked from the simulator's delivery thread, once per produced frame.
pub type SensorDataCallback = Arc<dyn Fn(SensorPacket) + Send + Sync>;

/// Camera data source trait
///
/// # Example
///
/// ```ignore
/// let camera: Box<dyn SensorSource> = client.sensor_source(actor_id, "rgb".into(), modality)?;
/// camera.listen(Arc::new(|packet| queue.push(packet)));
/// // ... tick ...
/// camera.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Sensor ID
    fn sensor_id(&self) -> &str;

    /// Camera modality
    fn modality(&self) -> CameraModality;

    /// Register data callback
    ///
    /// Repeated calls while listening are ignored: the first callback stays
    /// registered.
    fn listen(&self, callback: SensorDataCallback);

    /// Stop delivering frames
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
