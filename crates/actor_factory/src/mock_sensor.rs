//! Mock camera implementation
//!
//! `MockCamera` implements `SensorSource` over a `CameraFeed` owned by the
//! `MockSimulator`. The simulator renders one frame per tick for every feed
//! with a registered callback, the way a server-side camera streams its
//! images to the client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use contracts::{
    CameraModality, FlowData, FrameId, ImageData, ImageFormat, SensorDataCallback, SensorId,
    SensorPacket, SensorPayload, SensorSource,
};
use tracing::debug;

/// Delivery slot shared by a spawned camera and its `MockCamera` handles
pub struct CameraFeed {
    pub modality: CameraModality,
    pub width: u32,
    pub height: u32,
    listening: AtomicBool,
    callback: Mutex<Option<(SensorId, SensorDataCallback)>>,
}

impl CameraFeed {
    pub fn new(modality: CameraModality, width: u32, height: u32) -> Self {
        Self {
            modality,
            width,
            height,
            listening: AtomicBool::new(false),
            callback: Mutex::new(None),
        }
    }

    /// Registered callback, if the camera is listening
    pub fn subscriber(&self) -> Option<(SensorId, SensorDataCallback)> {
        if !self.listening.load(Ordering::Acquire) {
            return None;
        }
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Detach the callback (camera destroyed)
    pub fn close(&self) {
        self.listening.store(false, Ordering::Release);
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Render the frame this camera produced on tick `frame`
    pub fn render(&self, sensor_id: SensorId, frame: FrameId, timestamp: f64) -> SensorPacket {
        let payload = match self.modality {
            CameraModality::OpticalFlow => SensorPayload::Flow(flow_field(self.width, self.height, frame)),
            modality => SensorPayload::Image(image(modality, self.width, self.height, frame)),
        };
        SensorPacket {
            sensor_id,
            modality: self.modality,
            frame,
            timestamp,
            payload,
        }
    }
}

/// BGRA test pattern per modality
fn image(modality: CameraModality, width: u32, height: u32, frame: FrameId) -> ImageData {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let (b, g, r) = match modality {
                CameraModality::Rgb => (x as u8, y as u8, (frame % 256) as u8),
                // 24-bit normalised depth, grows towards the bottom rows
                CameraModality::Depth => {
                    let depth = (u64::from(y) * 0xFF_FFFF / u64::from(height.max(1))) as u32;
                    ((depth >> 16) as u8, (depth >> 8) as u8, depth as u8)
                }
                // R = semantic tag, G/B = instance id
                _ => (((x / 8) % 256) as u8, ((y / 8) % 256) as u8, if y > height / 2 { 1 } else { 7 }),
            };
            data.extend_from_slice(&[b, g, r, 255]);
        }
    }
    ImageData {
        width,
        height,
        format: ImageFormat::Bgra8,
        data: Bytes::from(data),
    }
}

/// Rotating flow field, normalised to the image size
fn flow_field(width: u32, height: u32, frame: FrameId) -> FlowData {
    let phase = (frame % 360) as f32 * std::f32::consts::PI / 180.0;
    let mut data = Vec::with_capacity((width * height * 2) as usize);
    for y in 0..height {
        for x in 0..width {
            let fx = x as f32 / width.max(1) as f32 - 0.5;
            let fy = y as f32 / height.max(1) as f32 - 0.5;
            data.push(0.02 * (fx * phase.cos() - fy * phase.sin()));
            data.push(0.02 * (fx * phase.sin() + fy * phase.cos()));
        }
    }
    FlowData {
        width,
        height,
        data,
    }
}

/// Mock camera
///
/// Implements `SensorSource`; frames arrive from the simulator's tick, not
/// from a timer.
pub struct MockCamera {
    sensor_id: SensorId,
    feed: Arc<CameraFeed>,
}

impl MockCamera {
    pub fn new(sensor_id: SensorId, feed: Arc<CameraFeed>) -> Self {
        Self { sensor_id, feed }
    }
}

impl SensorSource for MockCamera {
    fn sensor_id(&self) -> &str {
        self.sensor_id.as_str()
    }

    fn modality(&self) -> CameraModality {
        self.feed.modality
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, keep the first callback
        if self.feed.listening.swap(true, Ordering::AcqRel) {
            return;
        }
        *self
            .feed
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((self.sensor_id.clone(), callback));
        debug!(sensor_id = %self.sensor_id, modality = %self.feed.modality, "mock camera listening");
    }

    fn stop(&self) {
        if self.feed.listening.swap(false, Ordering::AcqRel) {
            self.feed
                .callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            debug!(sensor_id = %self.sensor_id, "mock camera stopped");
        }
    }

    fn is_listening(&self) -> bool {
        self.feed.listening.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn listen_is_idempotent() {
        let feed = Arc::new(CameraFeed::new(CameraModality::Rgb, 4, 4));
        let camera = MockCamera::new("rgb".into(), feed.clone());

        let count = Arc::new(AtomicU64::new(0));
        let first = count.clone();
        let second = count.clone();
        camera.listen(Arc::new(move |_| {
            first.fetch_add(1, Ordering::Relaxed);
        }));
        camera.listen(Arc::new(move |_| {
            second.fetch_add(100, Ordering::Relaxed);
        }));

        let (sensor_id, callback) = feed.subscriber().unwrap();
        callback(feed.render(sensor_id, 1, 0.04));
        assert_eq!(count.load(Ordering::Relaxed), 1);

        camera.stop();
        assert!(!camera.is_listening());
        assert!(feed.subscriber().is_none());
    }

    #[test]
    fn rendered_payload_matches_modality() {
        let rgb = CameraFeed::new(CameraModality::Rgb, 3, 2).render("rgb".into(), 9, 0.36);
        assert_eq!(rgb.frame, 9);
        match rgb.payload {
            SensorPayload::Image(img) => {
                assert_eq!(img.format, ImageFormat::Bgra8);
                assert_eq!(img.data.len(), 3 * 2 * 4);
            }
            SensorPayload::Flow(_) => panic!("rgb camera rendered flow"),
        }

        let ofl = CameraFeed::new(CameraModality::OpticalFlow, 3, 2).render("ofl".into(), 9, 0.36);
        match ofl.payload {
            SensorPayload::Flow(flow) => assert_eq!(flow.data.len(), 3 * 2 * 2),
            SensorPayload::Image(_) => panic!("flow camera rendered image"),
        }
    }
}
