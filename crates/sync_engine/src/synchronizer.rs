//! Tick synchronizer implementation.

use std::time::{Duration, Instant};

use contracts::{FrameId, SensorPacket, SyncStats};
use ingestion::CameraQueue;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SyncError};

/// Camera packets of one tick
#[derive(Debug, Clone)]
pub struct SyncedPackets {
    /// One packet per queue, in registration order
    pub packets: Vec<SensorPacket>,
    /// Per-tick statistics
    pub stats: SyncStats,
}

/// Drains camera queues for a target frame id
///
/// Each queue gets its own `timeout` budget, shared by the stale packets
/// discarded before the matching one arrives.
#[derive(Debug, Clone)]
pub struct TickSynchronizer {
    queues: Vec<CameraQueue>,
}

impl TickSynchronizer {
    pub fn new(queues: Vec<CameraQueue>) -> Self {
        Self { queues }
    }

    pub fn camera_count(&self) -> usize {
        self.queues.len()
    }

    pub fn queues(&self) -> &[CameraQueue] {
        &self.queues
    }

    /// Collect the packet tagged `target` from every queue
    ///
    /// # Errors
    /// - `Timeout`: a queue delivered nothing for `target` within `timeout`
    /// - `FrameAhead`: a queue delivered a frame newer than `target`
    /// - `QueueClosed`: a camera was unregistered while waiting
    #[instrument(name = "sync_drain", skip(self), fields(target, cameras = self.queues.len()))]
    pub async fn drain(&self, target: FrameId, timeout: Duration) -> Result<SyncedPackets> {
        let started = Instant::now();
        let mut stats = SyncStats::default();
        let mut packets = Vec::with_capacity(self.queues.len());

        for queue in &self.queues {
            match Self::drain_one(queue, target, timeout, &mut stats).await {
                Ok(packet) => packets.push(packet),
                Err(e) => {
                    observability::record_sync_failure(e.reason());
                    warn!(error = %e, "camera synchronisation failed");
                    return Err(e);
                }
            }
        }

        stats.wait_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        observability::record_tick(target, &stats);
        Ok(SyncedPackets { packets, stats })
    }

    async fn drain_one(
        queue: &CameraQueue,
        target: FrameId,
        timeout: Duration,
        stats: &mut SyncStats,
    ) -> Result<SensorPacket> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let packet = match tokio::time::timeout(remaining, queue.recv()).await {
                Ok(Ok(packet)) => packet,
                Ok(Err(_)) => {
                    return Err(SyncError::QueueClosed {
                        sensor_id: queue.sensor_id().to_string(),
                        frame: target,
                    })
                }
                Err(_) => {
                    return Err(SyncError::Timeout {
                        sensor_id: queue.sensor_id().to_string(),
                        frame: target,
                        waited_ms: timeout.as_millis() as u64,
                    })
                }
            };

            match packet.frame.cmp(&target) {
                std::cmp::Ordering::Equal => return Ok(packet),
                std::cmp::Ordering::Less => {
                    stats.stale_discarded += 1;
                    debug!(
                        sensor_id = %queue.sensor_id(),
                        frame = packet.frame,
                        target,
                        "discarding stale packet"
                    );
                }
                std::cmp::Ordering::Greater => {
                    return Err(SyncError::FrameAhead {
                        sensor_id: queue.sensor_id().to_string(),
                        expected: target,
                        actual: packet.frame,
                    })
                }
            }
        }
    }
}
