//! ScenarioParams - 场景参数表的一行
//!
//! 列顺序固定 (见 `ScenarioParams::COLUMNS`)，`hash` 为其余单元格的内容哈希。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{Location, Rotation, Transform, WeatherPreset};

/// 一个仿真场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ScenarioParams {
    /// 内容哈希，同时作为样本目录名
    #[validate(length(min = 1, message = "hash must not be empty"))]
    pub hash: String,

    /// 数据集划分 (train / val / test)
    #[validate(length(min = 1, message = "split must not be empty"))]
    pub split: String,

    /// 地图名 (e.g., "Town03_Opt")
    #[validate(length(min = 1, message = "map must not be empty"))]
    pub map: String,

    /// 交通管理器与会话随机种子
    pub seed: u64,

    /// 帧率，受物理子步约束至少为 10
    #[validate(range(min = 10, message = "fps must be at least 10"))]
    pub fps: u32,

    /// 记录时长 (秒)
    #[validate(range(min = 1, message = "duration must be at least 1 second"))]
    pub duration: u32,

    #[validate(range(min = 1, message = "n_vehicles must include the operator"))]
    pub n_vehicles: u32,

    pub n_walkers: u32,

    pub weather: WeatherPreset,

    /// 相对限速的百分比差值
    pub speed_diff: f64,

    #[validate(range(min = 1, message = "img_h must be positive"))]
    pub img_h: u32,

    #[validate(range(min = 1, message = "img_w must be positive"))]
    pub img_w: u32,

    /// 水平视场角 (度)
    #[validate(range(exclusive_min = 0.0, exclusive_max = 180.0, message = "fov must be in (0, 180)"))]
    pub fov: f64,

    pub cam_pitch: f64,
    pub cam_yaw: f64,
    pub cam_roll: f64,
    pub cam_x: f64,
    pub cam_y: f64,
    pub cam_z: f64,
}

impl ScenarioParams {
    /// 参数表列名 (顺序固定)
    pub const COLUMNS: [&'static str; 19] = [
        "hash", "split", "map", "seed", "fps", "duration", "n_vehicles", "n_walkers", "weather",
        "speed_diff", "img_h", "img_w", "fov", "cam_pitch", "cam_yaw", "cam_roll", "cam_x",
        "cam_y", "cam_z",
    ];

    /// 相机相对操作车的安装位姿
    pub fn camera_transform(&self) -> Transform {
        Transform::new(
            Location::new(self.cam_x, self.cam_y, self.cam_z),
            Rotation::new(self.cam_pitch, self.cam_yaw, self.cam_roll),
        )
    }

    /// 除 `hash` 外的单元格文本 (按列顺序)
    ///
    /// 数值使用最短表示：整数值浮点数不带小数部分 (`90`, `0`)。
    pub fn content_cells(&self) -> Vec<String> {
        vec![
            self.split.clone(),
            self.map.clone(),
            self.seed.to_string(),
            self.fps.to_string(),
            self.duration.to_string(),
            self.n_vehicles.to_string(),
            self.n_walkers.to_string(),
            self.weather.to_string(),
            self.speed_diff.to_string(),
            self.img_h.to_string(),
            self.img_w.to_string(),
            self.fov.to_string(),
            self.cam_pitch.to_string(),
            self.cam_yaw.to_string(),
            self.cam_roll.to_string(),
            self.cam_x.to_string(),
            self.cam_y.to_string(),
            self.cam_z.to_string(),
        ]
    }

    /// 全部单元格文本 (含 `hash`)
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(Self::COLUMNS.len());
        cells.push(self.hash.clone());
        cells.extend(self.content_cells());
        cells
    }

    /// 预热 + 记录的总 tick 数
    pub fn total_ticks(&self, warmup_seconds: u32) -> u64 {
        u64::from(self.fps) * (u64::from(self.duration) + u64::from(warmup_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample() -> ScenarioParams {
        ScenarioParams {
            hash: "abc".into(),
            split: "val".into(),
            map: "Town01_Opt".into(),
            seed: 42,
            fps: 25,
            duration: 300,
            n_vehicles: 100,
            n_walkers: 50,
            weather: WeatherPreset::ClearNoon,
            speed_diff: -20.0,
            img_h: 128,
            img_w: 128,
            fov: 90.0,
            cam_pitch: 0.0,
            cam_yaw: 0.0,
            cam_roll: 0.0,
            cam_x: 1.5,
            cam_y: 0.0,
            cam_z: 2.4,
        }
    }

    #[test]
    fn cells_render_integral_floats_without_fraction() {
        let cells = sample().cells();
        assert_eq!(cells.len(), ScenarioParams::COLUMNS.len());
        assert_eq!(cells[12], "90");
        assert_eq!(cells[13], "0");
        assert_eq!(cells[16], "1.5");
        assert_eq!(cells[18], "2.4");
        assert_eq!(cells[8], "ClearNoon");
        assert_eq!(cells[9], "-20");
    }

    #[test]
    fn validation_rejects_low_fps_and_bad_fov() {
        assert!(sample().validate().is_ok());

        let mut low_fps = sample();
        low_fps.fps = 5;
        let errors = low_fps.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("fps"));

        let mut wide = sample();
        wide.fov = 180.0;
        assert!(wide.validate().is_err());
    }

    #[test]
    fn total_ticks_include_warmup() {
        assert_eq!(sample().total_ticks(3), 25 * 303);
        assert_eq!(sample().camera_transform().location.z, 2.4);
    }
}
