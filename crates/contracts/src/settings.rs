//! 世界设置、交通管理器设置与天气预设

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 仿真世界设置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    /// 同步模式：服务器等待客户端 tick
    pub synchronous_mode: bool,

    /// 固定步长 (秒)，None 表示可变步长
    pub fixed_delta_seconds: Option<f64>,

    /// 行人布娃娃物理是否确定性
    pub deterministic_ragdolls: bool,

    /// 物理子步最大步长 (秒)
    pub max_substep_delta_time: f64,

    /// 物理子步数量上限
    pub max_substeps: u32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            synchronous_mode: false,
            fixed_delta_seconds: None,
            deterministic_ragdolls: false,
            max_substep_delta_time: 0.01,
            max_substeps: 10,
        }
    }
}

impl WorldSettings {
    /// 同步、固定步长、确定性的设置
    ///
    /// 物理子步约束：`1/fps <= max_substep_delta_time * max_substeps`，
    /// 因此 fps 至少为 10。
    pub fn synchronous(fps: u32) -> Self {
        Self {
            synchronous_mode: true,
            fixed_delta_seconds: Some(1.0 / f64::from(fps.max(1))),
            deterministic_ragdolls: true,
            max_substep_delta_time: 0.01,
            max_substeps: 10,
        }
    }

    /// 固定步长是否满足子步约束
    pub fn substepping_valid(&self) -> bool {
        match self.fixed_delta_seconds {
            Some(dt) => dt <= self.max_substep_delta_time * f64::from(self.max_substeps) + 1e-9,
            None => true,
        }
    }
}

/// 交通管理器设置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficManagerSettings {
    /// 交通管理器端口
    pub port: u16,

    /// 与前车保持的距离 (米)
    pub distance_to_leading_vehicle: f64,

    /// 相对限速的百分比差值 (正数更慢)
    pub speed_difference_percent: f64,

    /// 随机种子
    pub seed: u64,

    /// 同步模式
    pub synchronous_mode: bool,
}

impl TrafficManagerSettings {
    pub fn new(port: u16, speed_difference_percent: f64, seed: u64) -> Self {
        Self {
            port,
            distance_to_leading_vehicle: 1.0,
            speed_difference_percent,
            seed,
            synchronous_mode: true,
        }
    }
}

/// 天气预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherPreset {
    Default,
    ClearNoon,
    CloudyNoon,
    WetNoon,
    WetCloudyNoon,
    SoftRainNoon,
    MidRainyNoon,
    HardRainNoon,
    ClearSunset,
    CloudySunset,
    WetSunset,
    WetCloudySunset,
    SoftRainSunset,
    MidRainSunset,
    HardRainSunset,
}

impl WeatherPreset {
    /// 全部预设 (顺序固定，参数生成依赖此顺序)
    pub const ALL: [WeatherPreset; 15] = [
        Self::Default,
        Self::ClearNoon,
        Self::CloudyNoon,
        Self::WetNoon,
        Self::WetCloudyNoon,
        Self::SoftRainNoon,
        Self::MidRainyNoon,
        Self::HardRainNoon,
        Self::ClearSunset,
        Self::CloudySunset,
        Self::WetSunset,
        Self::WetCloudySunset,
        Self::SoftRainSunset,
        Self::MidRainSunset,
        Self::HardRainSunset,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::ClearNoon => "ClearNoon",
            Self::CloudyNoon => "CloudyNoon",
            Self::WetNoon => "WetNoon",
            Self::WetCloudyNoon => "WetCloudyNoon",
            Self::SoftRainNoon => "SoftRainNoon",
            Self::MidRainyNoon => "MidRainyNoon",
            Self::HardRainNoon => "HardRainNoon",
            Self::ClearSunset => "ClearSunset",
            Self::CloudySunset => "CloudySunset",
            Self::WetSunset => "WetSunset",
            Self::WetCloudySunset => "WetCloudySunset",
            Self::SoftRainSunset => "SoftRainSunset",
            Self::MidRainSunset => "MidRainSunset",
            Self::HardRainSunset => "HardRainSunset",
        }
    }

    /// 是否为日落时段
    pub fn is_sunset(self) -> bool {
        self.name().ends_with("Sunset")
    }
}

impl fmt::Display for WeatherPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeatherPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.name() == s)
            .ok_or_else(|| format!("unknown weather preset '{s}'"))
    }
}
