//! DatasetSink - writes accepted ticks into a sample directory
//!
//! Layout under the sample directory:
//! - `<rgb|dep|isg|ofl>/<frame:08>.png`
//! - `actors/<frame:08>.csv`
//! - `frame_info.csv` (written on close)

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ActorState, ContractError, DataSink, FrameId, FrameMeta, FrameSample, SensorPacket};
use tracing::{debug, error, info, instrument};

use crate::encode::encode_packet;
use crate::error::{DispatcherError, Result};

/// Actor table directory
pub const ACTORS_DIR: &str = "actors";

/// Per-frame operator table
pub const FRAME_INFO_FILE: &str = "frame_info.csv";

/// `00000042.png`
pub fn frame_file_name(frame: FrameId, extension: &str) -> String {
    format!("{frame:08}.{extension}")
}

/// Sink that writes camera images and actor tables to disk
pub struct DatasetSink {
    name: String,
    root: PathBuf,
    created_dirs: HashSet<PathBuf>,
    frame_meta: Vec<FrameMeta>,
    closed: bool,
}

impl DatasetSink {
    /// Create a sink writing under `root`, creating `root/actors`
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        let actors = root.join(ACTORS_DIR);
        fs::create_dir_all(&actors)?;

        Ok(Self {
            name: name.into(),
            root,
            created_dirs: HashSet::from([actors]),
            frame_meta: Vec::new(),
            closed: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Operator rows of the frames written so far
    pub fn frame_meta(&self) -> &[FrameMeta] {
        &self.frame_meta
    }

    fn ensure_dir(&mut self, dir: PathBuf) -> std::io::Result<PathBuf> {
        if !self.created_dirs.contains(&dir) {
            fs::create_dir_all(&dir)?;
            self.created_dirs.insert(dir.clone());
        }
        Ok(dir)
    }

    fn write_sample(&mut self, sample: &FrameSample) -> Result<()> {
        for packet in &sample.cameras {
            self.write_camera(packet)?;
        }
        self.write_actors(sample.frame, &sample.actors)?;
        self.frame_meta.push(sample.meta.clone());
        Ok(())
    }

    fn write_camera(&mut self, packet: &SensorPacket) -> Result<()> {
        let dir = self.ensure_dir(self.root.join(packet.modality.dir_name()))?;
        let path = dir.join(frame_file_name(packet.frame, "png"));
        encode_packet(packet)?
            .save(&path)
            .map_err(|source| DispatcherError::Image { path, source })
    }

    fn write_actors(&self, frame: FrameId, actors: &[ActorState]) -> Result<()> {
        let path = self.root.join(ACTORS_DIR).join(frame_file_name(frame, "csv"));
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(ActorState::CSV_HEADER)?;
        for actor in actors {
            writer.write_record(actor_record(actor)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_frame_info(&self) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.root.join(FRAME_INFO_FILE))?;
        writer.write_record(FrameMeta::CSV_HEADER)?;
        for meta in &self.frame_meta {
            writer.write_record([
                meta.frame.to_string(),
                meta.traffic_light_label().to_string(),
                meta.speed_limit.to_string(),
                meta.speed.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn persist(&mut self, sample: &FrameSample) -> std::result::Result<(), ContractError> {
        self.write_sample(sample).map_err(|e| {
            error!(sink = %self.name, frame = sample.frame, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

/// One actor table row; attributes are a JSON object
fn actor_record(actor: &ActorState) -> Result<Vec<String>> {
    let mut record = Vec::with_capacity(ActorState::CSV_HEADER.len());
    record.push(actor.id.to_string());
    record.push(actor.type_id.clone());
    record.push(serde_json::to_string(&actor.attributes)?);
    record.extend(actor.numeric_columns().iter().map(f64::to_string));
    Ok(record)
}

impl DataSink for DatasetSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "dataset_sink_write",
        skip(self, sample),
        fields(sink = %self.name, frame = sample.frame)
    )]
    async fn write(&mut self, sample: &FrameSample) -> std::result::Result<(), ContractError> {
        self.persist(sample)
    }

    #[instrument(name = "dataset_sink_flush", skip(self))]
    async fn flush(&mut self) -> std::result::Result<(), ContractError> {
        // Every file is complete once written
        Ok(())
    }

    #[instrument(name = "dataset_sink_close", skip(self), fields(frames = self.frame_meta.len()))]
    async fn close(&mut self) -> std::result::Result<(), ContractError> {
        if self.closed {
            debug!(sink = %self.name, "DatasetSink already closed");
            return Ok(());
        }
        self.write_frame_info()?;
        self.closed = true;
        info!(sink = %self.name, root = %self.root.display(), frames = self.frame_meta.len(), "frame info written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{
        CameraModality, FlowData, ImageData, ImageFormat, Location, SensorPayload, TrafficLightState, Transform,
    };
    use tempfile::tempdir;

    fn packet(modality: CameraModality, frame: FrameId) -> SensorPacket {
        let payload = match modality {
            CameraModality::OpticalFlow => SensorPayload::Flow(FlowData {
                width: 2,
                height: 2,
                data: vec![0.5; 8],
            }),
            _ => SensorPayload::Image(ImageData {
                width: 2,
                height: 2,
                format: ImageFormat::Bgra8,
                data: Bytes::from(vec![40u8; 16]),
            }),
        };
        SensorPacket {
            sensor_id: modality.dir_name().into(),
            modality,
            frame,
            timestamp: 0.0,
            payload,
        }
    }

    fn sample(frame: FrameId) -> FrameSample {
        let mut operator = ActorState::new(7, "vehicle.audi.etron", Transform::from_location(Location::new(1.0, 2.0, 0.5)));
        operator.attributes.insert("role_name".into(), "autopilot".into());
        FrameSample {
            frame,
            timestamp: frame as f64 * 0.05,
            meta: FrameMeta {
                frame,
                traffic_light: (frame % 2 == 0).then_some(TrafficLightState::Red),
                speed_limit: 30.0,
                speed: 12.5,
            },
            actors: vec![operator, ActorState::new(9, "walker.pedestrian.0001", Transform::default())],
            cameras: CameraModality::RIG.iter().map(|&m| packet(m, frame)).collect(),
        }
    }

    #[tokio::test]
    async fn writes_images_actors_and_frame_info() {
        let dir = tempdir().unwrap();
        let mut sink = DatasetSink::new("dataset", dir.path()).unwrap();

        sink.write(&sample(41)).await.unwrap();
        sink.write(&sample(42)).await.unwrap();
        sink.close().await.unwrap();

        for name in ["rgb", "dep", "isg", "ofl"] {
            let png = dir.path().join(name).join("00000042.png");
            assert!(png.exists(), "missing {}", png.display());
        }
        let depth = image::open(dir.path().join("dep/00000041.png")).unwrap();
        assert_eq!(depth.color(), image::ColorType::L8);

        let mut reader = csv::Reader::from_path(dir.path().join("actors/00000042.csv")).unwrap();
        assert_eq!(reader.headers().unwrap().len(), ActorState::CSV_HEADER.len());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "7");
        assert_eq!(&rows[0][2], r#"{"role_name":"autopilot"}"#);
        assert_eq!(&rows[1][2], "{}");

        let info = fs::read_to_string(dir.path().join(FRAME_INFO_FILE)).unwrap();
        let lines: Vec<_> = info.lines().collect();
        assert_eq!(lines, ["frame,traffic_light,speed_limit,speed", "41,None,30,12.5", "42,Red,30,12.5"]);
    }

    #[tokio::test]
    async fn close_without_frames_writes_header_only() {
        let dir = tempdir().unwrap();
        let mut sink = DatasetSink::new("dataset", dir.path().join("sample")).unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();

        let info = fs::read_to_string(dir.path().join("sample").join(FRAME_INFO_FILE)).unwrap();
        assert_eq!(info.trim_end(), "frame,traffic_light,speed_limit,speed");
        assert!(dir.path().join("sample/actors").is_dir());
        assert!(sink.frame_meta().is_empty());
    }

    #[tokio::test]
    async fn bad_payload_fails_the_write() {
        let dir = tempdir().unwrap();
        let mut sink = DatasetSink::new("dataset", dir.path()).unwrap();
        let mut bad = sample(3);
        bad.cameras[0].payload = SensorPayload::Image(ImageData {
            width: 4,
            height: 4,
            format: ImageFormat::Bgra8,
            data: Bytes::from_static(&[0; 4]),
        });

        let err = sink.write(&bad).await.unwrap_err();
        assert!(matches!(err, ContractError::SinkWrite { .. }));
        assert!(sink.frame_meta().is_empty());
    }

    #[test]
    fn frame_file_names_are_zero_padded() {
        assert_eq!(frame_file_name(42, "png"), "00000042.png");
        assert_eq!(frame_file_name(123_456_789, "csv"), "123456789.csv");
    }
}
