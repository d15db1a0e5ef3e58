//! # Session
//!
//! 同步世界会话：一行场景参数对应一次会话。
//!
//! 负责：
//! - 加载地图，配置交通管理器与行人横穿比例
//! - 布置操作车及其相机组、背景车辆、行人及 AI 控制器
//! - 每个 tick 采集操作车元数据、actor 状态与帧号一致的相机数据
//! - 退出时按顺序销毁全部 actor
//!
//! ## 使用示例
//!
//! ```ignore
//! use session::{SessionConfig, SyncWorld};
//!
//! let config = SessionConfig::from_params(&params, 8000).with_warmup_seconds(3);
//! let (frames, summary) = SyncWorld::scope(client, config, async |world| {
//!     let sample = world.tick(Duration::from_secs(1)).await?;
//!     Ok::<_, SessionError>(sample.frame)
//! })
//! .await?;
//! ```

mod config;
mod error;
pub mod population;
mod world;

pub use config::{SessionConfig, DEFAULT_TM_PORT};
pub use error::{Result, SessionError};
pub use world::{SessionSummary, SyncWorld};
