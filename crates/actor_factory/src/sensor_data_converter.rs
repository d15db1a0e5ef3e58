//! CARLA 相机数据转换
//!
//! 将 CARLA 原生相机数据转换为 `SensorPacket`。
//! 仅在 `real-carla` feature 启用时编译。

use bytes::Bytes;
use carla::sensor::data::{Image, OpticalFlowImage};
use carla::sensor::{SensorData, SensorDataBase};
use contracts::{
    CameraModality, FlowData, ImageData, ImageFormat, SensorId, SensorPacket, SensorPayload,
};

/// 将 CARLA Image 转换为 SensorPayload (BGRA)
fn image_to_payload(image: &Image) -> SensorPayload {
    SensorPayload::Image(ImageData {
        width: image.width() as u32,
        height: image.height() as u32,
        format: ImageFormat::Bgra8,
        data: Bytes::copy_from_slice(image.as_raw_bytes()),
    })
}

/// 将 CARLA 光流图转换为 SensorPayload
fn flow_to_payload(flow: &OpticalFlowImage) -> SensorPayload {
    let data = flow.as_slice().iter().flat_map(|px| [px.x, px.y]).collect();
    SensorPayload::Flow(FlowData {
        width: flow.width() as u32,
        height: flow.height() as u32,
        data,
    })
}

/// 将 CARLA 传感器数据转换为 SensorPacket
///
/// 数据类型与相机模态不匹配时返回 None。
pub fn convert_sensor_data(
    sensor_id: &SensorId,
    modality: CameraModality,
    data: &SensorData,
) -> Option<SensorPacket> {
    let timestamp = data.timestamp();
    let frame = data.frame() as u64;

    let payload = match modality {
        CameraModality::OpticalFlow => {
            let flow = OpticalFlowImage::try_from(data.clone()).ok()?;
            flow_to_payload(&flow)
        }
        _ => {
            let image = Image::try_from(data.clone()).ok()?;
            image_to_payload(&image)
        }
    };

    Some(SensorPacket {
        sensor_id: sensor_id.clone(),
        modality,
        frame,
        timestamp,
        payload,
    })
}
