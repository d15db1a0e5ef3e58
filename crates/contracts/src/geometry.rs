//! 几何类型
//!
//! 与模拟器一致的左手坐标系 (UE4)：x 向前，y 向右，z 向上；角度单位为度。

use serde::{Deserialize, Serialize};

/// 位置 (米)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 到另一点的欧氏距离
    pub fn distance(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// 旋转 (度)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotation {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// 3D 向量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 向量长度
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// 3D 变换：位置 + 旋转
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Location,
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    /// 仅位置，旋转为零
    pub fn from_location(location: Location) -> Self {
        Self {
            location,
            rotation: Rotation::default(),
        }
    }

    fn trig(&self) -> (f64, f64, f64, f64, f64, f64) {
        let (sp, cp) = self.rotation.pitch.to_radians().sin_cos();
        let (sy, cy) = self.rotation.yaw.to_radians().sin_cos();
        let (sr, cr) = self.rotation.roll.to_radians().sin_cos();
        (sp, cp, sy, cy, sr, cr)
    }

    /// 前向单位向量
    pub fn forward_vector(&self) -> Vector3 {
        let (sp, cp, sy, cy, _, _) = self.trig();
        Vector3::new(cp * cy, cp * sy, sp)
    }

    /// 右向单位向量
    pub fn right_vector(&self) -> Vector3 {
        let (sp, cp, sy, cy, sr, cr) = self.trig();
        Vector3::new(cy * sp * sr - sy * cr, sy * sp * sr + cy * cr, -cp * sr)
    }

    /// 上向单位向量
    pub fn up_vector(&self) -> Vector3 {
        let (sp, cp, sy, cy, sr, cr) = self.trig();
        Vector3::new(-cy * sp * cr - sy * sr, -sy * sp * cr + cy * sr, cp * cr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vector3, b: Vector3) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9 && (a.z - b.z).abs() < 1e-9
    }

    #[test]
    fn identity_basis() {
        let tf = Transform::default();
        assert!(approx(tf.forward_vector(), Vector3::new(1.0, 0.0, 0.0)));
        assert!(approx(tf.right_vector(), Vector3::new(0.0, 1.0, 0.0)));
        assert!(approx(tf.up_vector(), Vector3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn yaw_90_turns_forward_to_y() {
        let tf = Transform::new(Location::default(), Rotation::new(0.0, 90.0, 0.0));
        assert!(approx(tf.forward_vector(), Vector3::new(0.0, 1.0, 0.0)));
        assert!(approx(tf.right_vector(), Vector3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn basis_stays_orthonormal() {
        let tf = Transform::new(Location::default(), Rotation::new(12.0, -37.0, 5.5));
        let f = tf.forward_vector();
        let r = tf.right_vector();
        let u = tf.up_vector();
        let dot = |a: Vector3, b: Vector3| a.x * b.x + a.y * b.y + a.z * b.z;
        assert!(dot(f, r).abs() < 1e-9);
        assert!(dot(f, u).abs() < 1e-9);
        assert!(dot(r, u).abs() < 1e-9);
        assert!((f.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn vector_length() {
        assert!((Vector3::new(3.0, 4.0, 0.0).length() - 5.0).abs() < 1e-12);
    }
}
