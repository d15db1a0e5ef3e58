//! Ingestion Pipeline main entry

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{unbounded, Receiver, Sender};
use contracts::{CameraModality, SensorDataCallback, SensorId, SensorPacket, SensorSource};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{IngestionError, Result};
use crate::stats::IngestionMetrics;

/// Delivery queue of a single camera
///
/// Cheap to clone: clones share the same underlying channel.
#[derive(Debug, Clone)]
pub struct CameraQueue {
    sensor_id: SensorId,
    modality: CameraModality,
    rx: Receiver<SensorPacket>,
}

impl CameraQueue {
    /// Create a queue together with its feeding end
    pub fn channel(sensor_id: SensorId, modality: CameraModality) -> (Sender<SensorPacket>, Self) {
        let (tx, rx) = unbounded();
        (
            tx,
            Self {
                sensor_id,
                modality,
                rx,
            },
        )
    }

    pub fn sensor_id(&self) -> &SensorId {
        &self.sensor_id
    }

    pub fn modality(&self) -> CameraModality {
        self.modality
    }

    /// Wait for the next packet
    ///
    /// # Errors
    /// The queue has been closed and is empty
    pub async fn recv(&self) -> Result<SensorPacket> {
        self.rx.recv().await.map_err(|_| IngestionError::ChannelClosed {
            sensor_id: self.sensor_id.to_string(),
        })
    }

    /// Take a packet if one is already queued
    pub fn try_recv(&self) -> Option<SensorPacket> {
        self.rx.try_recv().ok()
    }

    /// Number of packets waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// A registered camera
struct Registration {
    queue: CameraQueue,
    source: Box<dyn SensorSource>,
    tx: Sender<SensorPacket>,
    listening: Arc<AtomicBool>,
}

impl Registration {
    fn start(&self, metrics: &Arc<IngestionMetrics>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let sensor_id = self.queue.sensor_id.clone();
        let tx = self.tx.clone();
        let listening = self.listening.clone();
        let metrics = metrics.clone();

        debug!(sensor_id = %sensor_id, "starting camera");

        let callback: SensorDataCallback = Arc::new(move |packet| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received();
            metrics::counter!("scene_recorder_packets_received_total", "camera" => sensor_id.to_string())
                .increment(1);
            trace!(sensor_id = %sensor_id, frame = packet.frame, "camera packet queued");

            if tx.try_send(packet).is_err() {
                metrics.record_dropped();
                warn!(sensor_id = %sensor_id, "queue closed, packet dropped");
            }
        });

        self.source.listen(callback);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(sensor_id = %self.queue.sensor_id, "stopping camera");
            self.source.stop();
        }
    }
}

/// Ingestion Pipeline
///
/// One unbounded queue per camera; the synchronizer drains them in
/// registration order once per tick.
#[derive(Default)]
pub struct IngestionPipeline {
    /// Registered cameras, in registration order
    cameras: Vec<Registration>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a camera source
    ///
    /// The queue exists from registration on, so packets delivered right
    /// after `start_all` are never lost.
    ///
    /// # Errors
    /// A camera with the same sensor ID is already registered
    #[instrument(
        name = "ingestion_register_sensor_source",
        skip(self, source),
        fields(sensor_id = %source.sensor_id(), modality = %source.modality())
    )]
    pub fn register_sensor_source(&mut self, source: Box<dyn SensorSource>) -> Result<()> {
        let sensor_id = SensorId::new(source.sensor_id());
        if self.cameras.iter().any(|c| c.queue.sensor_id == sensor_id) {
            return Err(IngestionError::AlreadyRegistered {
                sensor_id: sensor_id.to_string(),
            });
        }

        let (tx, queue) = CameraQueue::channel(sensor_id, source.modality());
        debug!(sensor_id = %queue.sensor_id, "registered sensor source");
        self.cameras.push(Registration {
            queue,
            source,
            tx,
            listening: Arc::new(AtomicBool::new(false)),
        });
        Ok(())
    }

    /// Start all registered cameras
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.cameras.len(), "starting all cameras");
        for camera in &self.cameras {
            camera.start(&self.metrics);
        }
    }

    /// Stop all cameras
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        debug!(count = self.cameras.len(), "stopping all cameras");
        for camera in &self.cameras {
            camera.stop();
        }
    }

    /// Queues in registration order
    pub fn queues(&self) -> Vec<CameraQueue> {
        self.cameras.iter().map(|c| c.queue.clone()).collect()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered camera count
    pub fn sensor_count(&self) -> usize {
        self.cameras.len()
    }

    /// Check if specified camera is listening
    pub fn is_sensor_listening(&self, sensor_id: &str) -> bool {
        self.cameras
            .iter()
            .find(|c| c.queue.sensor_id == sensor_id)
            .is_some_and(|c| c.listening.load(Ordering::Relaxed))
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{ImageData, ImageFormat, SensorPayload};
    use std::sync::Mutex;

    /// Test camera: frames are pushed by hand through `emit`
    #[derive(Clone)]
    struct TestCamera {
        sensor_id: String,
        modality: CameraModality,
        callback: Arc<Mutex<Option<SensorDataCallback>>>,
        stops: Arc<Mutex<u32>>,
    }

    impl TestCamera {
        fn new(sensor_id: &str, modality: CameraModality) -> Self {
            Self {
                sensor_id: sensor_id.to_string(),
                modality,
                callback: Arc::new(Mutex::new(None)),
                stops: Arc::new(Mutex::new(0)),
            }
        }

        fn emit(&self, frame: u64) {
            let callback = self.callback.lock().unwrap().clone();
            if let Some(callback) = callback {
                callback(SensorPacket {
                    sensor_id: self.sensor_id.as_str().into(),
                    modality: self.modality,
                    frame,
                    timestamp: frame as f64 * 0.05,
                    payload: SensorPayload::Image(ImageData {
                        width: 1,
                        height: 1,
                        format: ImageFormat::Bgra8,
                        data: Bytes::from_static(&[0, 0, 0, 255]),
                    }),
                });
            }
        }
    }

    impl SensorSource for TestCamera {
        fn sensor_id(&self) -> &str {
            &self.sensor_id
        }

        fn modality(&self) -> CameraModality {
            self.modality
        }

        fn listen(&self, callback: SensorDataCallback) {
            *self.callback.lock().unwrap() = Some(callback);
        }

        fn stop(&self) {
            *self.stops.lock().unwrap() += 1;
            *self.callback.lock().unwrap() = None;
        }

        fn is_listening(&self) -> bool {
            self.callback.lock().unwrap().is_some()
        }
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestionPipeline::new();
        assert_eq!(pipeline.sensor_count(), 0);
        assert!(pipeline.queues().is_empty());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut pipeline = IngestionPipeline::new();
        pipeline
            .register_sensor_source(Box::new(TestCamera::new("rgb", CameraModality::Rgb)))
            .unwrap();
        let err = pipeline
            .register_sensor_source(Box::new(TestCamera::new("rgb", CameraModality::Rgb)))
            .unwrap_err();
        assert!(matches!(err, IngestionError::AlreadyRegistered { .. }));
    }

    #[tokio::test]
    async fn packets_land_in_their_own_queue_in_rig_order() {
        let rgb = TestCamera::new("rgb", CameraModality::Rgb);
        let dep = TestCamera::new("dep", CameraModality::Depth);

        let mut pipeline = IngestionPipeline::new();
        pipeline.register_sensor_source(Box::new(rgb.clone())).unwrap();
        pipeline.register_sensor_source(Box::new(dep.clone())).unwrap();
        pipeline.start_all();

        dep.emit(7);
        rgb.emit(7);
        rgb.emit(8);

        let queues = pipeline.queues();
        assert_eq!(queues[0].sensor_id(), &"rgb");
        assert_eq!(queues[1].modality(), CameraModality::Depth);
        assert_eq!(queues[0].len(), 2);
        assert_eq!(queues[0].recv().await.unwrap().frame, 7);
        assert_eq!(queues[1].recv().await.unwrap().sensor_id, "dep");
        assert_eq!(pipeline.metrics().snapshot().packets_received, 3);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let rgb = TestCamera::new("rgb", CameraModality::Rgb);
        let mut pipeline = IngestionPipeline::new();
        pipeline.register_sensor_source(Box::new(rgb.clone())).unwrap();

        pipeline.start_all();
        pipeline.start_all();
        assert!(pipeline.is_sensor_listening("rgb"));

        pipeline.stop_all();
        pipeline.stop_all();
        assert!(!pipeline.is_sensor_listening("rgb"));
        assert_eq!(*rgb.stops.lock().unwrap(), 1);
    }

    #[test]
    fn drop_stops_sources() {
        let rgb = TestCamera::new("rgb", CameraModality::Rgb);
        {
            let mut pipeline = IngestionPipeline::new();
            pipeline.register_sensor_source(Box::new(rgb.clone())).unwrap();
            pipeline.start_all();
        }
        assert!(!rgb.is_listening());
    }

    #[tokio::test]
    async fn queue_outlives_pipeline_until_drained() {
        let rgb = TestCamera::new("rgb", CameraModality::Rgb);
        let mut pipeline = IngestionPipeline::new();
        pipeline.register_sensor_source(Box::new(rgb.clone())).unwrap();
        pipeline.start_all();
        rgb.emit(3);

        let queue = pipeline.queues().remove(0);
        drop(pipeline);

        assert_eq!(queue.try_recv().map(|p| p.frame), Some(3));
        assert!(queue.recv().await.is_err());
    }
}
