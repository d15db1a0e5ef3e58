//! WorldRoster - 会话期间存活的 actor 句柄
//!
//! 记录操作车、相机、背景车辆与行人 (及其 AI 控制器)，
//! 用于逐帧采样与退出时的销毁顺序。

use std::collections::HashMap;

use crate::{CameraModality, SensorId};

/// 模拟器 actor 句柄
pub type ActorId = u32;

/// 模拟器帧号
pub type FrameId = u64;

/// 挂载在操作车上的相机
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraHandle {
    pub sensor_id: SensorId,
    pub modality: CameraModality,
    pub actor_id: ActorId,
}

/// 行人及其控制器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkerHandle {
    pub walker_id: ActorId,
    pub controller_id: ActorId,
    /// 控制器最大速度 (m/s)
    pub speed: f64,
}

/// 会话 actor 名册
#[derive(Debug, Clone, Default)]
pub struct WorldRoster {
    /// 操作车
    pub operator: Option<ActorId>,

    /// 相机 (按相机组顺序)
    pub cameras: Vec<CameraHandle>,

    /// 背景车辆
    pub vehicles: Vec<ActorId>,

    /// 行人
    pub walkers: Vec<WalkerHandle>,

    /// Actor 句柄 -> 角色 (反查)
    roles: HashMap<ActorId, ActorRole>,
}

/// Actor 在会话中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRole {
    Operator,
    Camera,
    Vehicle,
    Walker,
    WalkerController,
}

impl WorldRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_operator(&mut self, actor_id: ActorId) {
        self.roles.insert(actor_id, ActorRole::Operator);
        self.operator = Some(actor_id);
    }

    pub fn register_camera(&mut self, sensor_id: SensorId, modality: CameraModality, actor_id: ActorId) {
        self.roles.insert(actor_id, ActorRole::Camera);
        self.cameras.push(CameraHandle {
            sensor_id,
            modality,
            actor_id,
        });
    }

    pub fn register_vehicle(&mut self, actor_id: ActorId) {
        self.roles.insert(actor_id, ActorRole::Vehicle);
        self.vehicles.push(actor_id);
    }

    pub fn register_walker(&mut self, walker_id: ActorId, controller_id: ActorId, speed: f64) {
        self.roles.insert(walker_id, ActorRole::Walker);
        self.roles.insert(controller_id, ActorRole::WalkerController);
        self.walkers.push(WalkerHandle {
            walker_id,
            controller_id,
            speed,
        });
    }

    pub fn role_of(&self, actor_id: ActorId) -> Option<ActorRole> {
        self.roles.get(&actor_id).copied()
    }

    /// 逐帧采样的 actor：操作车、车辆、行人 (按此顺序)
    pub fn tracked_actors(&self) -> Vec<ActorId> {
        self.operator
            .iter()
            .copied()
            .chain(self.vehicles.iter().copied())
            .chain(self.walkers.iter().map(|w| w.walker_id))
            .collect()
    }

    /// 销毁顺序：车辆、行人 (控制器先于行人)、相机、操作车
    pub fn teardown_order(&self) -> Vec<ActorId> {
        let mut ids = Vec::with_capacity(self.roles.len());
        ids.extend(self.vehicles.iter().copied());
        for walker in &self.walkers {
            ids.push(walker.controller_id);
            ids.push(walker.walker_id);
        }
        ids.extend(self.cameras.iter().map(|c| c.actor_id));
        ids.extend(self.operator);
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// 清空名册 (销毁完成后)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> WorldRoster {
        let mut roster = WorldRoster::new();
        roster.set_operator(1);
        roster.register_camera("rgb".into(), CameraModality::Rgb, 2);
        roster.register_vehicle(10);
        roster.register_vehicle(11);
        roster.register_walker(20, 30, 1.4);
        roster
    }

    #[test]
    fn tracked_actor_order() {
        assert_eq!(roster().tracked_actors(), vec![1, 10, 11, 20]);
    }

    #[test]
    fn teardown_controllers_before_walkers_and_operator_last() {
        assert_eq!(roster().teardown_order(), vec![10, 11, 30, 20, 2, 1]);
    }

    #[test]
    fn roles_and_clear() {
        let mut roster = roster();
        assert_eq!(roster.role_of(30), Some(ActorRole::WalkerController));
        assert_eq!(roster.role_of(99), None);
        roster.clear();
        assert!(roster.is_empty());
        assert!(roster.tracked_actors().is_empty());
    }
}
