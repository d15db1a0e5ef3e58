//! 参数表校验
//!
//! 校验规则：
//! - 字段约束 (`ScenarioParams` 上的 `validator` 属性)
//! - 物理子步约束：fps 对应的固定步长不超过子步总长
//! - hash 唯一 (同一 hash 对应同一个样本目录)

use std::collections::HashMap;

use validator::Validate;

use contracts::{ScenarioParams, WorldSettings};

use crate::error::{Result, ScenarioError};

/// 校验整张表
///
/// 返回第一个遇到的错误；行号从 1 开始。
pub fn validate(rows: &[ScenarioParams]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(rows.len());

    for (idx, params) in rows.iter().enumerate() {
        let row = idx + 1;
        validate_row(row, params)?;

        if let Some(first) = seen.insert(params.hash.as_str(), row) {
            return Err(ScenarioError::validation(
                row,
                "hash",
                format!("duplicate hash '{}' (first seen in row {first})", params.hash),
            ));
        }
    }
    Ok(())
}

/// 校验单行
pub fn validate_row(row: usize, params: &ScenarioParams) -> Result<()> {
    if let Err(errors) = params.validate() {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some((field, errs)) = fields.into_iter().next() {
            let message = errs
                .iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .next()
                .unwrap_or_else(|| format!("invalid value ({})", errs[0].code));
            return Err(ScenarioError::validation(row, field.to_string(), message));
        }
    }

    if !WorldSettings::synchronous(params.fps).substepping_valid() {
        return Err(ScenarioError::validation(
            row,
            "fps",
            format!("fps {} exceeds physics substepping limits", params.fps),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::WeatherPreset;

    fn params(hash: &str) -> ScenarioParams {
        ScenarioParams {
            hash: hash.into(),
            split: "train".into(),
            map: "Town05_Opt".into(),
            seed: 7,
            fps: 25,
            duration: 300,
            n_vehicles: 150,
            n_walkers: 100,
            weather: WeatherPreset::SoftRainSunset,
            speed_diff: 0.0,
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
    fn valid_table_passes() {
        assert!(validate(&[params("a"), params("b")]).is_ok());
    }

    #[test]
    fn duplicate_hash_rejected() {
        let err = validate(&[params("a"), params("a")]).unwrap_err();
        match err {
            ScenarioError::Validation { row, field, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "hash");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn low_fps_names_row_and_field() {
        let mut bad = params("b");
        bad.fps = 5;
        let err = validate(&[params("a"), bad]).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("row 2"), "{text}");
        assert!(text.contains("fps"), "{text}");
    }

    #[test]
    fn empty_hash_rejected() {
        let err = validate_row(1, &params("")).unwrap_err();
        assert!(err.to_string().contains("hash"));
    }
}
