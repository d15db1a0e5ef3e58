//! LogSink - logs a per-frame summary via tracing

use contracts::{ContractError, DataSink, FrameSample};
use tracing::{info, instrument};

/// Sink that logs frame summaries for debugging
pub struct LogSink {
    name: String,
    frames: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: 0,
        }
    }

    /// Frames logged so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn log_frame_summary(&self, sample: &FrameSample) {
        info!(
            sink = %self.name,
            frame = sample.frame,
            timestamp = sample.timestamp,
            cameras = sample.cameras.len(),
            actors = sample.actors.len(),
            speed = sample.meta.speed,
            traffic_light = sample.meta.traffic_light_label(),
            "FrameSample received"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, sample),
        fields(sink = %self.name, frame = sample.frame)
    )]
    async fn write(&mut self, sample: &FrameSample) -> Result<(), ContractError> {
        self.log_frame_summary(sample);
        self.frames += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, frames = self.frames, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FrameMeta, FrameSample};

    fn sample(frame: u64) -> FrameSample {
        FrameSample {
            frame,
            timestamp: 1.0,
            meta: FrameMeta {
                frame,
                traffic_light: None,
                speed_limit: 50.0,
                speed: 0.0,
            },
            actors: Vec::new(),
            cameras: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        assert!(sink.write(&sample(1)).await.is_ok());
        assert!(sink.write(&sample(2)).await.is_ok());
        assert_eq!(sink.frames(), 2);
        assert!(sink.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
