//! Camera payload encoding
//!
//! Turns a camera packet into the image written to disk:
//! - `rgb`, `isg`: channel reorder to RGB
//! - `dep`: normalised 24-bit depth to 8-bit grey
//! - `ofl`: colour-coded flow (direction as hue, magnitude as value)

use contracts::{CameraModality, FlowData, ImageData, ImageFormat, SensorPacket, SensorPayload};
use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::{DispatcherError, Result};

/// Encode one camera packet
///
/// # Errors
/// Returns `Encode` when the buffer size does not match the image dimensions.
pub fn encode_packet(packet: &SensorPacket) -> Result<DynamicImage> {
    let encoded = match (&packet.payload, packet.modality) {
        (SensorPayload::Flow(flow), _) => color_coded_flow(flow).map(DynamicImage::ImageRgb8),
        (SensorPayload::Image(image), CameraModality::Depth) => depth_to_grey(image).map(DynamicImage::ImageLuma8),
        (SensorPayload::Image(image), _) => to_rgb(image).map(DynamicImage::ImageRgb8),
    };
    encoded.ok_or_else(|| {
        let (width, height) = packet.payload.dimensions();
        DispatcherError::encode(
            &packet.sensor_id,
            packet.frame,
            format!("buffer does not hold a {width}x{height} image"),
        )
    })
}

/// Pixels as `[r, g, b]`, whatever the source layout
fn rgb_pixels(image: &ImageData) -> Option<impl Iterator<Item = [u8; 3]> + '_> {
    let bpp = image.format.bytes_per_pixel();
    let expected = image.width as usize * image.height as usize * bpp;
    if image.data.len() != expected {
        return None;
    }

    let format = image.format;
    Some(image.data.chunks_exact(bpp).map(move |px| match format {
        ImageFormat::Bgra8 => [px[2], px[1], px[0]],
        ImageFormat::Rgb8 | ImageFormat::Rgba8 => [px[0], px[1], px[2]],
    }))
}

/// BGRA/RGBA to RGB
pub fn to_rgb(image: &ImageData) -> Option<RgbImage> {
    let data: Vec<u8> = rgb_pixels(image)?.flatten().collect();
    RgbImage::from_raw(image.width, image.height, data)
}

/// Linear depth: `(R + G*256 + B*256^2) / (256^3 - 1)` scaled to 0..=255
pub fn depth_to_grey(image: &ImageData) -> Option<GrayImage> {
    const MAX_DEPTH: f64 = 16_777_215.0;

    let data: Vec<u8> = rgb_pixels(image)?
        .map(|[r, g, b]| {
            let depth = (f64::from(r) + f64::from(g) * 256.0 + f64::from(b) * 65_536.0) / MAX_DEPTH;
            (depth * 255.0).round() as u8
        })
        .collect();
    GrayImage::from_raw(image.width, image.height, data)
}

/// Colour-coded optical flow
///
/// Hue follows the flow direction, value grows logarithmically with the
/// magnitude, saturation is fixed at 1.
pub fn color_coded_flow(flow: &FlowData) -> Option<RgbImage> {
    let expected = flow.width as usize * flow.height as usize * 2;
    if flow.data.len() != expected {
        return None;
    }

    const SHIFT: f32 = 0.999;
    let scale = 1.0 / (0.1 + SHIFT).ln();

    let data: Vec<u8> = flow
        .data
        .chunks_exact(2)
        .flat_map(|v| {
            let (vx, vy) = (v[0], v[1]);
            let hue = (180.0 + vy.atan2(vx).to_degrees()).rem_euclid(360.0);
            let norm = (vx * vx + vy * vy).sqrt();
            let value = (scale * (norm + SHIFT).ln()).clamp(0.0, 1.0);
            hsv_to_rgb(hue, 1.0, value)
        })
        .collect();
    RgbImage::from_raw(flow.width, flow.height, data)
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [u8; 3] {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r, g, b].map(|channel| ((channel + m) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn bgra(width: u32, height: u32, pixels: &[[u8; 4]]) -> ImageData {
        ImageData {
            width,
            height,
            format: ImageFormat::Bgra8,
            data: Bytes::from(pixels.concat()),
        }
    }

    #[test]
    fn bgra_is_reordered_to_rgb() {
        let image = bgra(2, 1, &[[1, 2, 3, 255], [10, 20, 30, 255]]);
        let rgb = to_rgb(&image).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [3, 2, 1]);
        assert_eq!(rgb.get_pixel(1, 0).0, [30, 20, 10]);
    }

    #[test]
    fn depth_extremes_map_to_black_and_white() {
        // B is the most significant byte
        let image = bgra(3, 1, &[[0, 0, 0, 255], [255, 255, 255, 255], [128, 0, 0, 255]]);
        let grey = depth_to_grey(&image).unwrap();
        assert_eq!(grey.get_pixel(0, 0).0, [0]);
        assert_eq!(grey.get_pixel(1, 0).0, [255]);
        assert_eq!(grey.get_pixel(2, 0).0, [128]);
    }

    #[test]
    fn still_flow_is_black_and_motion_is_saturated() {
        let flow = FlowData {
            width: 2,
            height: 1,
            data: vec![0.0, 0.0, 1.0, 0.0],
        };
        let image = color_coded_flow(&flow).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
        // +x motion: hue 180, cyan at full value
        assert_eq!(image.get_pixel(1, 0).0, [0, 255, 255]);
    }

    #[test]
    fn short_buffer_is_an_encode_error() {
        let packet = SensorPacket {
            sensor_id: "rgb".into(),
            modality: CameraModality::Rgb,
            frame: 7,
            timestamp: 0.0,
            payload: SensorPayload::Image(bgra(2, 2, &[[0, 0, 0, 0]])),
        };
        let err = encode_packet(&packet).unwrap_err();
        assert!(matches!(err, DispatcherError::Encode { frame: 7, .. }));
    }

    #[test]
    fn packet_encoding_follows_modality() {
        let mut packet = SensorPacket {
            sensor_id: "dep".into(),
            modality: CameraModality::Depth,
            frame: 1,
            timestamp: 0.0,
            payload: SensorPayload::Image(bgra(1, 1, &[[0, 0, 0, 255]])),
        };
        assert!(matches!(encode_packet(&packet).unwrap(), DynamicImage::ImageLuma8(_)));

        packet.modality = CameraModality::InstanceSegmentation;
        assert!(matches!(encode_packet(&packet).unwrap(), DynamicImage::ImageRgb8(_)));
    }
}
