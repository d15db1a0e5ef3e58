//! sample_info.yml 记录
//!
//! 录制中的样本维护 `_sample_info.yml`，每次写入与已有键合并；
//! 录制完成后写入耗时 `time` 并重命名为 `sample_info.yml`。
//! 目录中存在 `sample_info.yml` 即表示该样本已完整录制。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ActorId, ScenarioParams};
use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, instrument};

use crate::error::Result;

/// 录制中的文件名
pub const PENDING_FILE: &str = "_sample_info.yml";

/// 完成后的文件名
pub const FINISHED_FILE: &str = "sample_info.yml";

/// 会话开始后写入的样本信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleInfo {
    pub split: String,
    #[serde(rename = "_hash")]
    pub hash: String,
    #[serde(rename = "_actor_id")]
    pub actor_id: ActorId,
    pub map_name: String,
    pub fps: u32,
    pub duration: u32,
    pub img_h: u32,
    pub img_w: u32,
    pub fov: f64,
    pub cam_pitch: f64,
    pub cam_yaw: f64,
    pub cam_roll: f64,
    pub cam_x: f64,
    pub cam_y: f64,
    pub cam_z: f64,
    pub seed: u64,
    pub n_vehicles: u32,
    pub n_walkers: u32,
    #[serde(rename = "_n_vehicles_actual")]
    pub n_vehicles_actual: usize,
    #[serde(rename = "_n_walkers_actual")]
    pub n_walkers_actual: usize,
    pub weather: String,
    pub speed_diff: f64,
}

impl SampleInfo {
    /// `duration` 为实际录制时长 (可能被命令行覆盖)
    pub fn new(
        params: &ScenarioParams,
        duration: u32,
        operator: ActorId,
        vehicles_actual: usize,
        walkers_actual: usize,
    ) -> Self {
        Self {
            split: params.split.clone(),
            hash: params.hash.clone(),
            actor_id: operator,
            map_name: params.map.clone(),
            fps: params.fps,
            duration,
            img_h: params.img_h,
            img_w: params.img_w,
            fov: params.fov,
            cam_pitch: params.cam_pitch,
            cam_yaw: params.cam_yaw,
            cam_roll: params.cam_roll,
            cam_x: params.cam_x,
            cam_y: params.cam_y,
            cam_z: params.cam_z,
            seed: params.seed,
            n_vehicles: params.n_vehicles,
            n_walkers: params.n_walkers,
            n_vehicles_actual: vehicles_actual,
            n_walkers_actual: walkers_actual,
            weather: params.weather.to_string(),
            speed_diff: params.speed_diff,
        }
    }
}

/// 录制完成时追加的信息
#[derive(Debug, Clone, Copy, Serialize)]
struct Finished {
    /// 样本耗时 (秒)
    time: f64,
}

pub fn pending_path(dir: &Path) -> PathBuf {
    dir.join(PENDING_FILE)
}

pub fn finished_path(dir: &Path) -> PathBuf {
    dir.join(FINISHED_FILE)
}

/// 样本是否已完整录制
pub fn is_finished(dir: &Path) -> bool {
    finished_path(dir).is_file()
}

/// 合并写入 `_sample_info.yml`
///
/// 键按字母序输出；`finish` 为真时重命名为 `sample_info.yml`。
///
/// # Errors
/// 读写失败、已有文件不是 YAML 映射
#[instrument(name = "sample_info_write", skip(data), fields(dir = %dir.display(), finish))]
pub fn write<T: Serialize>(dir: &Path, data: &T, finish: bool) -> Result<()> {
    let pending = pending_path(dir);

    let mut merged: BTreeMap<String, Value> = if pending.is_file() {
        serde_yaml::from_str(&fs::read_to_string(&pending)?)?
    } else {
        BTreeMap::new()
    };
    let update: BTreeMap<String, Value> = serde_yaml::from_value(serde_yaml::to_value(data)?)?;
    merged.extend(update);

    fs::write(&pending, serde_yaml::to_string(&merged)?)?;

    if finish {
        fs::rename(&pending, finished_path(dir))?;
        debug!(keys = merged.len(), "sample info finished");
    }
    Ok(())
}

/// 写入耗时并标记样本完成
pub fn finish(dir: &Path, elapsed_seconds: f64) -> Result<()> {
    write(dir, &Finished { time: elapsed_seconds }, true)
}

/// 读取样本信息 (优先完成文件)
pub fn read(dir: &Path) -> Result<BTreeMap<String, Value>> {
    let path = if is_finished(dir) {
        finished_path(dir)
    } else {
        pending_path(dir)
    };
    Ok(serde_yaml::from_str(&fs::read_to_string(path)?)?)
}
