//! FrameSample - 一次被接受的 tick
//!
//! Sync engine 汇总后的单帧数据：操作车元数据、全部被跟踪 actor 的状态、
//! 以及每个相机恰好一个帧号一致的数据包。

use serde::{Deserialize, Serialize};

use crate::{ActorState, FrameId, FrameMeta, SensorPacket};

/// 单帧采样
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSample {
    /// tick 帧号
    pub frame: FrameId,

    /// 仿真时间 (秒)
    pub timestamp: f64,

    /// 操作车元数据
    pub meta: FrameMeta,

    /// actor 状态 (操作车、车辆、行人)
    pub actors: Vec<ActorState>,

    /// 相机数据 (相机组顺序，帧号均等于 `frame`)
    pub cameras: Vec<SensorPacket>,
}

impl FrameSample {
    /// 所有相机数据包的帧号是否与 tick 一致
    pub fn is_consistent(&self) -> bool {
        self.cameras.iter().all(|p| p.frame == self.frame) && self.meta.frame == self.frame
    }
}

/// 同步统计 (单帧)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// 丢弃的过期数据包数量
    pub stale_discarded: u32,

    /// 等待相机数据的总时长 (微秒)
    pub wait_us: u64,
}
