//! Dispatcher - fans accepted ticks out to the sinks of one sample

use std::path::PathBuf;
use std::sync::Arc;

use contracts::FrameSample;
use tracing::{debug, info, instrument};

use crate::error::{DispatcherError, Result};
use crate::handle::{DeliveryPolicy, SinkHandle};
use crate::metrics::MetricsSnapshot;
use crate::sinks::{DatasetSink, LogSink};

/// Name of the dataset sink
pub const DATASET_SINK: &str = "dataset";

/// Name of the log sink
pub const LOG_SINK: &str = "log";

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sample directory
    pub root: PathBuf,
    /// Queue capacity of each sink
    pub queue_capacity: usize,
    /// Also log a summary of every frame
    pub log_frames: bool,
}

impl DispatcherConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            queue_capacity: 64,
            log_frames: false,
        }
    }

    pub fn with_log_frames(mut self, log_frames: bool) -> Self {
        self.log_frames = log_frames;
        self
    }
}

/// Per-sink results of a finished sample
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub sinks: Vec<(String, MetricsSnapshot)>,
}

impl DispatchReport {
    pub fn sink(&self, name: &str) -> Option<MetricsSnapshot> {
        self.sinks.iter().find(|(n, _)| n == name).map(|(_, m)| *m)
    }

    /// Frames the dataset sink wrote
    pub fn frames_written(&self) -> u64 {
        self.sink(DATASET_SINK).map_or(0, |m| m.written)
    }

    /// The dataset sink wrote every frame it was given
    pub fn dataset_complete(&self) -> bool {
        self.sink(DATASET_SINK).is_some_and(|m| m.is_complete())
    }
}

/// Fan-out of samples to sink workers
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    dispatched: u64,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles
    pub fn with_handles(handles: Vec<SinkHandle>) -> Self {
        Self { handles, dispatched: 0 }
    }

    /// Dataset sink (blocking) plus an optional log sink (dropping)
    ///
    /// # Errors
    /// `SinkCreation` when the sample directory cannot be created.
    #[instrument(name = "dispatcher_create", skip(config), fields(root = %config.root.display()))]
    pub fn for_sample(config: &DispatcherConfig) -> Result<Self> {
        let dataset = DatasetSink::new(DATASET_SINK, &config.root)
            .map_err(|e| DispatcherError::sink_creation(DATASET_SINK, e.to_string()))?;

        let mut handles = vec![SinkHandle::spawn(dataset, config.queue_capacity, DeliveryPolicy::Block)];
        if config.log_frames {
            handles.push(SinkHandle::spawn(
                LogSink::new(LOG_SINK),
                config.queue_capacity,
                DeliveryPolicy::DropNewest,
            ));
        }
        Ok(Self::with_handles(handles))
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.handles.iter().map(SinkHandle::name).collect()
    }

    /// Current metrics of all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Hand a sample to every sink
    ///
    /// # Errors
    /// `SinkClosed` when a sink worker has stopped.
    pub async fn dispatch(&mut self, sample: FrameSample) -> Result<()> {
        let sample = Arc::new(sample);
        for handle in &self.handles {
            handle.send(Arc::clone(&sample)).await?;
        }

        self.dispatched += 1;
        if self.dispatched.is_multiple_of(100) {
            debug!(frames = self.dispatched, "Dispatcher progress");
        }
        Ok(())
    }

    /// Drain the queues, then flush and close every sink
    #[instrument(name = "dispatcher_shutdown", skip(self), fields(frames = self.dispatched))]
    pub async fn shutdown(self) -> DispatchReport {
        let mut sinks = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            sinks.push((name, handle.shutdown().await));
        }
        info!(frames = self.dispatched, "Dispatcher shutdown complete");
        DispatchReport { sinks }
    }
}
