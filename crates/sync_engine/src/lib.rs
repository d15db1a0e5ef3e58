//! # Sync Engine
//!
//! tick 与相机帧号同步。
//!
//! 负责：
//! - 每个 tick 后按注册顺序逐个排空相机队列
//! - 丢弃并统计过期数据包 (帧号小于当前 tick)
//! - 帧号超前或等待超时视为同步失败
//! - 输出与 tick 帧号一致的一组数据包及 `SyncStats`
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::TickSynchronizer;
//!
//! let synchronizer = TickSynchronizer::new(pipeline.queues());
//!
//! let snapshot = client.tick().await?;
//! let synced = synchronizer.drain(snapshot.frame, Duration::from_secs(1)).await?;
//! assert!(synced.packets.iter().all(|p| p.frame == snapshot.frame));
//! ```

mod error;
mod synchronizer;

pub use error::{Result, SyncError};
pub use synchronizer::{SyncedPackets, TickSynchronizer};

// Re-export contracts types
pub use contracts::{SensorPacket, SyncStats};
