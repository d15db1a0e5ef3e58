//! 交通参与者的随机选择
//!
//! spawn point 抽样、背景车辆与行人的蓝图选择。所有随机性来自会话的
//! 种子 RNG，同一种子下选择结果可复现。

use contracts::{Blueprint, Transform};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::warn;

use crate::error::{Result, SessionError};

/// 容易出事故的车型 (按蓝图 ID 后缀排除)
pub const EXCLUDED_VEHICLES: [&str; 7] = [
    "microlino",
    "carlacola",
    "cybertruck",
    "t2",
    "sprinter",
    "firetruck",
    "ambulance",
];

/// 打乱 spawn points 并取前 `amount` 个 (含操作车)
///
/// spawn point 不足时记录警告并按实际数量返回。
pub fn shuffled_spawn_points<R: Rng + ?Sized>(
    mut points: Vec<Transform>,
    amount: usize,
    rng: &mut R,
) -> Vec<Transform> {
    points.shuffle(rng);

    if amount > points.len() {
        warn!(
            requested = amount,
            available = points.len(),
            "not enough spawn points, number of vehicles gets reduced accordingly"
        );
    }

    points.truncate(amount);
    points
}

/// 背景车辆蓝图池：四轮、排除特殊车型、按 ID 排序
pub fn vehicle_pool(blueprints: Vec<Blueprint>) -> Vec<Blueprint> {
    let mut pool: Vec<Blueprint> = blueprints
        .into_iter()
        .filter(|bp| {
            bp.attribute("number_of_wheels")
                .and_then(|v| v.parse::<u32>().ok())
                == Some(4)
        })
        .filter(|bp| !EXCLUDED_VEHICLES.iter().any(|suffix| bp.id.ends_with(suffix)))
        .collect();
    pool.sort_by(|a, b| a.id.cmp(&b.id));
    pool
}

/// 随机背景车辆蓝图：随机颜色与司机，`role_name=autopilot`
pub fn random_vehicle_blueprint<R: Rng + ?Sized>(pool: &[Blueprint], rng: &mut R) -> Result<Blueprint> {
    let mut blueprint = pool
        .choose(rng)
        .cloned()
        .ok_or_else(|| SessionError::NoBlueprints {
            filter: "vehicle.*".into(),
        })?;

    for key in ["color", "driver_id"] {
        if let Some(value) = blueprint.recommended_values(key).choose(rng).cloned() {
            blueprint.set_attribute(key, value);
        }
    }
    blueprint.set_attribute("role_name", "autopilot");
    Ok(blueprint)
}

/// 随机行人蓝图及其最大速度 (m/s)
///
/// 速度取自 `speed` 属性的推荐值：`r > 1 - running` 取 [1]，
/// `r <= standing` 取 [0]，其余取 [2]；没有速度属性时为 0。
pub fn random_walker_blueprint<R: Rng + ?Sized>(
    pool: &[Blueprint],
    running_factor: f64,
    standing_factor: f64,
    rng: &mut R,
) -> Result<(Blueprint, f64)> {
    let mut blueprint = pool
        .choose(rng)
        .cloned()
        .ok_or_else(|| SessionError::NoBlueprints {
            filter: "walker.pedestrian.*".into(),
        })?;

    if blueprint.has_attribute("is_invincible") {
        blueprint.set_attribute("is_invincible", "false");
    }

    let recommended = blueprint.recommended_values("speed");
    let speed = if recommended.is_empty() {
        warn!(blueprint = %blueprint.id, "walker has no speed");
        0.0
    } else {
        let r: f64 = rng.random();
        let index = if r > 1.0 - running_factor {
            1
        } else if r <= standing_factor {
            0
        } else {
            2
        };
        recommended
            .get(index)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0)
    };

    Ok((blueprint, speed))
}
