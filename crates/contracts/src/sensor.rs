//! SensorPacket - Ingestion 输出
//!
//! 相机回调产生的原始数据包，以及相机模态定义。

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{FrameId, SensorId};

/// 相机模态
///
/// 操作车挂载的相机组按 `CameraModality::RIG` 的顺序生成。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraModality {
    Rgb,
    Depth,
    InstanceSegmentation,
    OpticalFlow,
}

impl CameraModality {
    /// 操作车相机组 (顺序固定)
    pub const RIG: [CameraModality; 4] = [
        CameraModality::Rgb,
        CameraModality::Depth,
        CameraModality::InstanceSegmentation,
        CameraModality::OpticalFlow,
    ];

    /// 模拟器蓝图名称
    pub fn blueprint_id(self) -> &'static str {
        match self {
            Self::Rgb => "sensor.camera.rgb",
            Self::Depth => "sensor.camera.depth",
            Self::InstanceSegmentation => "sensor.camera.instance_segmentation",
            Self::OpticalFlow => "sensor.camera.optical_flow",
        }
    }

    /// 数据集中的目录名
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Depth => "dep",
            Self::InstanceSegmentation => "isg",
            Self::OpticalFlow => "ofl",
        }
    }

    /// 从蓝图名称反查模态
    pub fn from_blueprint_id(id: &str) -> Option<Self> {
        Self::RIG.into_iter().find(|m| m.blueprint_id() == id)
    }
}

impl fmt::Display for CameraModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for CameraModality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::RIG
            .into_iter()
            .find(|m| m.dir_name() == s)
            .or_else(|| Self::from_blueprint_id(s))
            .ok_or_else(|| format!("unknown camera modality '{s}'"))
    }
}

/// 传感器数据包
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorPacket {
    /// 传感器 ID
    pub sensor_id: SensorId,

    /// 相机模态
    pub modality: CameraModality,

    /// 产生该数据的 tick 帧号
    pub frame: FrameId,

    /// 仿真时间戳 (seconds)
    pub timestamp: f64,

    /// 数据载荷
    pub payload: SensorPayload,
}

/// 传感器数据载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorPayload {
    /// 图像数据 (RGB/Depth/InstanceSeg)
    Image(ImageData),

    /// 光流场
    Flow(FlowData),
}

impl SensorPayload {
    /// 载荷的宽高
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Image(image) => (image.width, image.height),
            Self::Flow(flow) => (flow.width, flow.height),
        }
    }
}

/// 图像数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// 原始像素数据
    pub data: Bytes,
}

/// 图像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
    Rgba8,
    /// 模拟器相机的原生格式
    Bgra8,
}

impl ImageFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

/// 光流数据：每像素 (dx, dy)，归一化到图像尺寸
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rig_names() {
        let dirs: Vec<_> = CameraModality::RIG.iter().map(|m| m.dir_name()).collect();
        assert_eq!(dirs, ["rgb", "dep", "isg", "ofl"]);
    }

    #[test]
    fn modality_parses_dir_and_blueprint() {
        assert_eq!("isg".parse::<CameraModality>(), Ok(CameraModality::InstanceSegmentation));
        assert_eq!(
            "sensor.camera.optical_flow".parse::<CameraModality>(),
            Ok(CameraModality::OpticalFlow)
        );
        assert!("lidar".parse::<CameraModality>().is_err());
    }

    #[test]
    fn payload_dimensions() {
        let payload = SensorPayload::Flow(FlowData {
            width: 4,
            height: 2,
            data: vec![0.0; 16],
        });
        assert_eq!(payload.dimensions(), (4, 2));
    }
}
