//! Per-actor kinematic rows and per-frame operator metadata

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ActorId, FrameId, Rotation, Location, Transform, Vector3};

/// Kinematic state of one actor at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: ActorId,
    pub type_id: String,
    /// Blueprint attributes the actor was spawned with
    pub attributes: BTreeMap<String, String>,
    pub transform: Transform,
    pub velocity: Vector3,
    pub acceleration: Vector3,
    pub angular_velocity: Vector3,
}

impl ActorState {
    /// Column names of an actor table
    pub const CSV_HEADER: [&'static str; 27] = [
        "id", "type_id", "attribs", "fwd_x", "fwd_y", "fwd_z", "rgt_x", "rgt_y", "rgt_z", "upp_x",
        "upp_y", "upp_z", "rot_p", "rot_y", "rot_r", "loc_x", "loc_y", "loc_z", "vel_x", "vel_y",
        "vel_z", "acc_x", "acc_y", "acc_z", "agv_x", "agv_y", "agv_z",
    ];

    pub fn new(id: ActorId, type_id: impl Into<String>, transform: Transform) -> Self {
        Self {
            id,
            type_id: type_id.into(),
            attributes: BTreeMap::new(),
            transform,
            velocity: Vector3::default(),
            acceleration: Vector3::default(),
            angular_velocity: Vector3::default(),
        }
    }

    pub fn location(&self) -> Location {
        self.transform.location
    }

    pub fn rotation(&self) -> Rotation {
        self.transform.rotation
    }

    /// Speed in km/h
    pub fn speed_kmh(&self) -> f64 {
        self.velocity.length() * 3.6
    }

    /// Numeric columns following `id,type_id,attribs`, in header order
    pub fn numeric_columns(&self) -> [f64; 24] {
        let fwd = self.transform.forward_vector();
        let rgt = self.transform.right_vector();
        let upp = self.transform.up_vector();
        let rot = self.transform.rotation;
        let loc = self.transform.location;
        let vel = self.velocity;
        let acc = self.acceleration;
        let agv = self.angular_velocity;
        [
            fwd.x, fwd.y, fwd.z, rgt.x, rgt.y, rgt.z, upp.x, upp.y, upp.z, rot.pitch, rot.yaw,
            rot.roll, loc.x, loc.y, loc.z, vel.x, vel.y, vel.z, acc.x, acc.y, acc.z, agv.x, agv.y,
            agv.z,
        ]
    }
}

/// Traffic light state as reported for the light affecting a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficLightState {
    Red,
    Yellow,
    Green,
    Off,
    Unknown,
}

impl TrafficLightState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Yellow => "Yellow",
            Self::Green => "Green",
            Self::Off => "Off",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TrafficLightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficLightState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Red" => Ok(Self::Red),
            "Yellow" => Ok(Self::Yellow),
            "Green" => Ok(Self::Green),
            "Off" => Ok(Self::Off),
            "Unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown traffic light state '{other}'")),
        }
    }
}

/// Operator state recorded once per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    pub frame: FrameId,
    /// `None` when the operator is not at a traffic light
    pub traffic_light: Option<TrafficLightState>,
    /// Speed limit in km/h
    pub speed_limit: f64,
    /// Operator speed in km/h
    pub speed: f64,
}

impl FrameMeta {
    pub const CSV_HEADER: [&'static str; 4] = ["frame", "traffic_light", "speed_limit", "speed"];

    /// Traffic light column value
    pub fn traffic_light_label(&self) -> &'static str {
        self.traffic_light.map_or("None", TrafficLightState::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_matches_numeric_columns() {
        let state = ActorState::new(1, "vehicle.audi.a2", Transform::default());
        assert_eq!(ActorState::CSV_HEADER.len(), 3 + state.numeric_columns().len());
    }

    #[test]
    fn numeric_columns_follow_header() {
        let mut state = ActorState::new(
            5,
            "walker.pedestrian.0001",
            Transform::new(Location::new(1.0, 2.0, 3.0), Rotation::new(0.0, 90.0, 0.0)),
        );
        state.velocity = Vector3::new(3.0, 4.0, 0.0);

        let cols = state.numeric_columns();
        // rot_y
        assert_eq!(cols[10], 90.0);
        // loc_x..loc_z
        assert_eq!(&cols[12..15], &[1.0, 2.0, 3.0]);
        assert!((state.speed_kmh() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn traffic_light_label() {
        let mut meta = FrameMeta {
            frame: 12,
            traffic_light: None,
            speed_limit: 30.0,
            speed: 0.0,
        };
        assert_eq!(meta.traffic_light_label(), "None");
        meta.traffic_light = Some(TrafficLightState::Red);
        assert_eq!(meta.traffic_light_label(), "Red");
        assert_eq!("Green".parse::<TrafficLightState>(), Ok(TrafficLightState::Green));
    }
}
