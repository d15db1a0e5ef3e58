//! # Dispatcher
//!
//! 样本写出模块。
//!
//! 负责：
//! - 消费 `FrameSample`
//! - Fan-out 到 dataset / log sinks
//! - 相机图像编码 (RGB、深度灰度、光流着色)
//! - 维护 `sample_info.yml`

pub mod dispatcher;
pub mod encode;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sample_info;
pub mod sinks;

pub use contracts::{DataSink, FrameSample};
pub use dispatcher::{DispatchReport, Dispatcher, DispatcherConfig, DATASET_SINK, LOG_SINK};
pub use error::{DispatcherError, Result};
pub use handle::{DeliveryPolicy, SinkHandle};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sample_info::SampleInfo;
pub use sinks::{DatasetSink, LogSink};
