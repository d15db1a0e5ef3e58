//! SinkHandle - runs a sink behind its own queue and worker task

use std::fmt;
use std::sync::Arc;

use contracts::{DataSink, FrameSample};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::error::{DispatcherError, Result};
use crate::metrics::{MetricsSnapshot, SinkMetrics};

/// What happens when a sink queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Wait for room (back-pressure on the tick loop)
    #[default]
    Block,
    /// Drop the incoming frame
    DropNewest,
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => f.write_str("block"),
            Self::DropNewest => f.write_str("drop_newest"),
        }
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    policy: DeliveryPolicy,
    tx: mpsc::Sender<Arc<FrameSample>>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `sink`
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize, policy: DeliveryPolicy) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            policy,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Hand a sample to the worker according to the delivery policy
    ///
    /// Returns `Ok(false)` when the sample was dropped because the queue was full.
    ///
    /// # Errors
    /// `SinkClosed` when the worker has stopped.
    pub async fn send(&self, sample: Arc<FrameSample>) -> Result<bool> {
        let frame = sample.frame;
        let closed = || DispatcherError::SinkClosed {
            sink_name: self.name.clone(),
            frame,
        };

        match self.policy {
            DeliveryPolicy::Block => {
                self.tx.send(sample).await.map_err(|_| closed())?;
            }
            DeliveryPolicy::DropNewest => match self.tx.try_send(sample) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.metrics.inc_dropped();
                    warn!(sink = %self.name, frame, "Queue full, frame dropped");
                    return Ok(false);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return Err(closed()),
            },
        }

        self.metrics.inc_enqueued();
        self.metrics.set_queue_len(self.tx.max_capacity() - self.tx.capacity());
        Ok(true)
    }

    /// Close the queue, wait for the worker to flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> MetricsSnapshot {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
        self.metrics.snapshot()
    }
}

/// Worker task that consumes samples and writes them to the sink
#[instrument(name = "sink_worker_loop", skip(sink, rx, metrics), fields(sink = %name))]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Arc<FrameSample>>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(sample) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&sample).await {
            Ok(()) => metrics.record_write(&name, true),
            Err(e) => {
                metrics.record_write(&name, false);
                // Keep going, one bad frame must not stop the sink
                error!(sink = %name, frame = sample.frame, error = %e, "Write failed");
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, FrameMeta};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    /// Mock sink for testing
    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        closed: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                write_count: Arc::new(AtomicU64::new(0)),
                closed: Arc::new(AtomicU64::new(0)),
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl DataSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _sample: &FrameSample) -> std::result::Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> std::result::Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> std::result::Result<(), ContractError> {
            self.closed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn sample(frame: u64) -> Arc<FrameSample> {
        Arc::new(FrameSample {
            frame,
            timestamp: frame as f64,
            meta: FrameMeta {
                frame,
                traffic_light: None,
                speed_limit: 30.0,
                speed: 0.0,
            },
            actors: Vec::new(),
            cameras: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let sink = MockSink::new("test");
        let write_count = Arc::clone(&sink.write_count);
        let closed = Arc::clone(&sink.closed);

        let handle = SinkHandle::spawn(sink, 10, DeliveryPolicy::Block);
        for i in 0..5 {
            assert!(handle.send(sample(i)).await.unwrap());
        }

        let snapshot = handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
        assert!(snapshot.is_complete());
    }

    #[tokio::test]
    async fn blocking_policy_never_drops() {
        let mut sink = MockSink::new("slow");
        sink.delay_ms = 5;
        let write_count = Arc::clone(&sink.write_count);

        let handle = SinkHandle::spawn(sink, 1, DeliveryPolicy::Block);
        for i in 0..10 {
            assert!(handle.send(sample(i)).await.unwrap());
        }

        let snapshot = handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 10);
        assert_eq!(snapshot.dropped, 0);
    }

    #[tokio::test]
    async fn drop_newest_policy_drops_when_full() {
        let mut sink = MockSink::new("slow");
        sink.delay_ms = 100;

        let handle = SinkHandle::spawn(sink, 2, DeliveryPolicy::DropNewest);
        let mut accepted = 0;
        for i in 0..10 {
            if handle.send(sample(i)).await.unwrap() {
                accepted += 1;
            }
        }

        assert!(handle.metrics().dropped() > 0);
        let snapshot = handle.shutdown().await;
        assert_eq!(snapshot.written, accepted);
        assert_eq!(snapshot.dropped, 10 - accepted);
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let mut sink = MockSink::new("failing");
        sink.should_fail = true;

        let handle = SinkHandle::spawn(sink, 10, DeliveryPolicy::Block);
        for i in 0..3 {
            handle.send(sample(i)).await.unwrap();
        }

        let snapshot = handle.shutdown().await;
        assert_eq!(snapshot.failed, 3);
        assert!(!snapshot.is_complete());
    }
}
