//! Session 错误类型

use actor_factory::ActorFactoryError;
use contracts::ContractError;
use ingestion::IngestionError;
use sync_engine::SyncError;
use thiserror::Error;

/// Session 错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 模拟器请求失败
    #[error(transparent)]
    Simulator(#[from] ActorFactoryError),

    /// 相机注册失败
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    /// 相机帧同步失败
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// 操作车 spawn 失败，会话无法继续
    #[error("operator spawn failed: {message}")]
    OperatorSpawn { message: String },

    /// 蓝图库中没有可用蓝图
    #[error("no usable blueprint matches '{filter}'")]
    NoBlueprints { filter: String },

    /// 会话已退出
    #[error("session has already exited")]
    Closed,
}

impl From<SessionError> for ContractError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Simulator(e) => e.into(),
            SessionError::Sync(e) => e.into(),
            SessionError::Ingestion(e) => e.into(),
            SessionError::OperatorSpawn { message } => ContractError::spawn("operator", message),
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Session Result 类型别名
pub type Result<T> = std::result::Result<T, SessionError>;
