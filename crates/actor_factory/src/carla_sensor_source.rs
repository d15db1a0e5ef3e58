//! CARLA Sensor SensorSource wrapper
//!
//! Wraps a CARLA camera as a `SensorSource`.
//! Only compiled when `real-carla` feature is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use carla::client::Sensor;
use contracts::{CameraModality, SensorDataCallback, SensorId, SensorSource};
use tracing::{debug, trace, warn};

use crate::sensor_data_converter::convert_sensor_data;

/// CARLA camera wrapper
pub struct CarlaSensorSource {
    sensor_id: SensorId,
    modality: CameraModality,
    sensor: Sensor,
    listening: Arc<AtomicBool>,
}

impl CarlaSensorSource {
    pub fn new(sensor_id: SensorId, modality: CameraModality, sensor: Sensor) -> Self {
        Self {
            sensor_id,
            modality,
            sensor,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SensorSource for CarlaSensorSource {
    fn sensor_id(&self) -> &str {
        self.sensor_id.as_str()
    }

    fn modality(&self) -> CameraModality {
        self.modality
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            warn!(sensor_id = %self.sensor_id, "sensor already listening");
            return;
        }

        let sensor_id = self.sensor_id.clone();
        let modality = self.modality;
        let listening = self.listening.clone();

        debug!(sensor_id = %sensor_id, modality = %modality, "starting CARLA camera");

        self.sensor.listen(move |sensor_data| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            match convert_sensor_data(&sensor_id, modality, &sensor_data) {
                Some(packet) => {
                    trace!(sensor_id = %sensor_id, frame = packet.frame, "camera frame received");
                    callback(packet);
                }
                None => {
                    warn!(sensor_id = %sensor_id, "failed to convert camera data");
                }
            }
        });
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(sensor_id = %self.sensor_id, "stopping CARLA camera");
            self.sensor.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
