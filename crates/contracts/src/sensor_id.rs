//! SensorId - camera identifier shared by packets, queues and the roster
//!
//! The id doubles as the camera's output directory name (`rgb`, `dep`, `ofl`).
//! Every packet clones it once per tick, so it is an `Arc<str>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Camera identifier.
///
/// ```
/// use contracts::SensorId;
///
/// let id: SensorId = "rgb".into();
/// assert_eq!(id, "rgb");
/// assert_eq!(id.to_string(), "rgb");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SensorId(Arc<str>);

impl SensorId {
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SensorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for SensorId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for SensorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SensorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| Self(Arc::from(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CameraModality;

    #[test]
    fn matches_directory_name() {
        for modality in [CameraModality::Rgb, CameraModality::Depth, CameraModality::OpticalFlow] {
            let id = SensorId::new(modality.dir_name());
            assert_eq!(id, modality.dir_name());
            assert_eq!(id.clone(), id);
        }
        assert_ne!(SensorId::new("rgb"), SensorId::new("dep"));
    }

    #[test]
    fn serde_as_plain_string() {
        let id = SensorId::new("ofl");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ofl\"");
        let back: SensorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
