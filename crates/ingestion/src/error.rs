//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 同一传感器 ID 重复注册
    #[error("sensor {sensor_id} is already registered")]
    AlreadyRegistered {
        /// 传感器 ID
        sensor_id: String,
    },

    /// 队列已关闭 (传感器已注销)
    #[error("queue closed for sensor {sensor_id}")]
    ChannelClosed {
        /// 传感器 ID
        sensor_id: String,
    },
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        ContractError::Other(err.to_string())
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
