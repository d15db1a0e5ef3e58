//! 录制指标收集模块
//!
//! Prometheus 指标 (全部以 `scene_recorder_` 为前缀) 以及内存中的运行统计。

use std::fmt;

use contracts::{FrameId, SyncStats};
use metrics::{counter, gauge, histogram};

/// 记录一次被接受的 tick
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tick;
///
/// let synced = synchronizer.drain(frame, timeout).await?;
/// record_tick(frame, &synced.stats);
/// ```
pub fn record_tick(frame: FrameId, stats: &SyncStats) {
    counter!("scene_recorder_ticks_total").increment(1);
    gauge!("scene_recorder_last_frame_id").set(frame as f64);
    histogram!("scene_recorder_sync_wait_ms").record(stats.wait_us as f64 / 1000.0);

    if stats.stale_discarded > 0 {
        counter!("scene_recorder_stale_packets_total").increment(u64::from(stats.stale_discarded));
    }
}

/// 记录同步失败 (超时、帧号超前、队列关闭)
pub fn record_sync_failure(reason: &str) {
    counter!(
        "scene_recorder_sync_failures_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录帧写入
pub fn record_frame_written(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "scene_recorder_frames_written_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录样本结果
pub fn record_sample_finished(outcome: SampleOutcome) {
    counter!(
        "scene_recorder_samples_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// 样本 (参数表的一行) 的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// 完整录制
    Recorded,
    /// 已存在 `sample_info.yml`，跳过
    Skipped,
    /// 录制中途失败
    Failed,
}

impl SampleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// 运行统计
///
/// 在内存中聚合整次运行的指标，运行结束后输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// 录制完成的样本数
    pub samples_recorded: u64,

    /// 跳过的样本数
    pub samples_skipped: u64,

    /// 失败的样本数
    pub samples_failed: u64,

    /// 被接受的 tick 总数 (含预热)
    pub ticks: u64,

    /// 写入磁盘的帧数
    pub frames_written: u64,

    /// 丢弃的过期数据包总数
    pub stale_discarded: u64,

    /// 每 tick 等待相机的时间 (毫秒)
    pub wait_ms: RunningStats,

    /// 每个样本的耗时 (秒)
    pub sample_seconds: RunningStats,
}

impl RunStats {
    /// 创建新的统计
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次 tick
    pub fn record_tick(&mut self, stats: &SyncStats) {
        self.ticks += 1;
        self.stale_discarded += u64::from(stats.stale_discarded);
        self.wait_ms.push(stats.wait_us as f64 / 1000.0);
    }

    /// 记录写入的帧
    pub fn record_frames_written(&mut self, count: u64) {
        self.frames_written += count;
    }

    /// 记录样本结果；仅完成的样本计入耗时统计
    pub fn record_sample(&mut self, outcome: SampleOutcome, elapsed_seconds: f64) {
        match outcome {
            SampleOutcome::Recorded => {
                self.samples_recorded += 1;
                self.sample_seconds.push(elapsed_seconds);
            }
            SampleOutcome::Skipped => self.samples_skipped += 1,
            SampleOutcome::Failed => self.samples_failed += 1,
        }
    }

    /// 处理过的样本总数
    pub fn samples_total(&self) -> u64 {
        self.samples_recorded + self.samples_skipped + self.samples_failed
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Recording Summary ===")?;
        writeln!(
            f,
            "Samples: {} recorded, {} skipped, {} failed",
            self.samples_recorded, self.samples_skipped, self.samples_failed
        )?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Frames written: {}", self.frames_written)?;
        writeln!(f, "Stale packets discarded: {}", self.stale_discarded)?;
        writeln!(f, "Camera wait (ms): {}", StatsSummary::from(&self.wait_ms))?;
        writeln!(f, "Sample time (s): {}", StatsSummary::from(&self.sample_seconds))?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
