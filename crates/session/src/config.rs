//! 会话配置

use contracts::{ScenarioParams, TrafficManagerSettings, Transform, WeatherPreset};

/// 默认交通管理器端口
pub const DEFAULT_TM_PORT: u16 = 8000;

/// 一次世界会话的配置
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub map: String,
    /// 交通管理器与会话随机选择的种子
    pub seed: u64,
    pub fps: u32,
    pub img_h: u32,
    pub img_w: u32,
    /// 水平视场角 (度)
    pub fov: f64,
    /// 相机相对操作车的安装位姿
    pub camera_transform: Transform,
    /// 含操作车
    pub n_vehicles: u32,
    pub n_walkers: u32,
    pub weather: WeatherPreset,
    /// 相对限速的百分比差值
    pub speed_diff: f64,
    pub tm_port: u16,
    /// 预热 tick 数，期间的帧元数据不累积
    pub warmup_ticks: u64,
    /// 奔跑行人比例
    pub running_factor: f64,
    /// 站立行人比例
    pub standing_factor: f64,
    /// 横穿马路行人比例
    pub crossing_factor: f64,
}

impl SessionConfig {
    /// 从参数表的一行构建
    pub fn from_params(params: &ScenarioParams, tm_port: u16) -> Self {
        Self {
            map: params.map.clone(),
            seed: params.seed,
            fps: params.fps,
            img_h: params.img_h,
            img_w: params.img_w,
            fov: params.fov,
            camera_transform: params.camera_transform(),
            n_vehicles: params.n_vehicles,
            n_walkers: params.n_walkers,
            weather: params.weather,
            speed_diff: params.speed_diff,
            tm_port,
            warmup_ticks: 0,
            running_factor: 0.5,
            standing_factor: 0.1,
            crossing_factor: 0.2,
        }
    }

    /// 设置预热秒数 (按 fps 换算为 tick)
    pub fn with_warmup_seconds(mut self, seconds: u32) -> Self {
        self.warmup_ticks = u64::from(seconds) * u64::from(self.fps);
        self
    }

    /// 交通管理器设置：确定性、同步模式
    pub fn traffic_manager(&self) -> TrafficManagerSettings {
        TrafficManagerSettings::new(self.tm_port, self.speed_diff, self.seed)
    }
}
