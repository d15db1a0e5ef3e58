//! 同步错误类型

use contracts::{ContractError, FrameId};
use thiserror::Error;

/// 同步错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// 相机未在超时内交付当前帧
    #[error("sensor '{sensor_id}' did not deliver frame {frame} within {waited_ms}ms")]
    Timeout {
        sensor_id: String,
        frame: FrameId,
        waited_ms: u64,
    },

    /// 相机交付了比当前 tick 更新的帧
    #[error("sensor '{sensor_id}' delivered frame {actual} while waiting for {expected}")]
    FrameAhead {
        sensor_id: String,
        expected: FrameId,
        actual: FrameId,
    },

    /// 相机队列已关闭
    #[error("queue of sensor '{sensor_id}' closed while waiting for frame {frame}")]
    QueueClosed { sensor_id: String, frame: FrameId },
}

impl SyncError {
    /// 指标标签
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::FrameAhead { .. } => "frame_ahead",
            Self::QueueClosed { .. } => "queue_closed",
        }
    }
}

impl From<SyncError> for ContractError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Timeout {
                sensor_id,
                frame,
                waited_ms,
            } => ContractError::SyncTimeout {
                sensor_id,
                frame,
                waited_ms,
            },
            SyncError::FrameAhead {
                sensor_id,
                expected,
                actual,
            } => ContractError::FrameMismatch {
                sensor_id,
                expected,
                actual,
            },
            other @ SyncError::QueueClosed { .. } => ContractError::Other(other.to_string()),
        }
    }
}

/// Sync Result 类型别名
pub type Result<T> = std::result::Result<T, SyncError>;
