//! # Scene Recorder
//!
//! 数据集录制驱动。
//!
//! 提供：
//! - 按参数表逐行录制样本
//! - 样本目录与 sample_info.yml 管理
//! - 运行结束或中断时恢复世界设置

pub mod error;
pub mod recorder;

pub use error::{CliError, Result};
pub use recorder::{copy_params_file, dataset_root, sample_dir, sensor_timeout, Recorder, RecorderConfig};
