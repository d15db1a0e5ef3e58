//! Mock 模拟器
//!
//! 进程内确定性世界，用于单元测试与 dry run。
//! 只模拟客户端可观察到的行为：地图、蓝图库、批量 spawn、
//! 交通管理器自动驾驶、行人导航、按 tick 下发的相机帧，
//! 并支持注入失败场景。

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use contracts::{
    wildcard_match, ActorId, ActorState, Blueprint, BlueprintAttribute, CameraModality,
    CommandResponse, FrameId, Location, Rotation, SensorDataCallback, SensorId, SensorPacket,
    SensorSource, SpawnCommand, TrafficLightState, TrafficManagerSettings, Transform, Vector3,
    WeatherPreset, WorldSettings,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument, trace, warn};

use crate::client::{SimulatorClient, Snapshot, VehicleStatus};
use crate::error::{ActorFactoryError, Result};
use crate::mock_sensor::{CameraFeed, MockCamera};

/// 服务器上可用的地图
pub const MOCK_MAPS: [&str; 8] = [
    "Town01_Opt",
    "Town02_Opt",
    "Town03_Opt",
    "Town04_Opt",
    "Town05_Opt",
    "Town06_Opt",
    "Town07_Opt",
    "Town10HD_Opt",
];

const FOUR_WHEELED: [&str; 15] = [
    "vehicle.audi.a2",
    "vehicle.audi.etron",
    "vehicle.audi.tt",
    "vehicle.bmw.grandtourer",
    "vehicle.chevrolet.impala",
    "vehicle.citroen.c3",
    "vehicle.dodge.charger_2020",
    "vehicle.ford.mustang",
    "vehicle.lincoln.mkz_2020",
    "vehicle.mercedes.coupe",
    "vehicle.mini.cooper_s",
    "vehicle.nissan.micra",
    "vehicle.seat.leon",
    "vehicle.tesla.model3",
    "vehicle.toyota.prius",
];

const SPECIAL_VEHICLES: [&str; 7] = [
    "vehicle.micro.microlino",
    "vehicle.carlamotors.carlacola",
    "vehicle.tesla.cybertruck",
    "vehicle.volkswagen.t2",
    "vehicle.mercedes.sprinter",
    "vehicle.carlamotors.firetruck",
    "vehicle.ford.ambulance",
];

const TWO_WHEELED: [&str; 3] = [
    "vehicle.bh.crossbike",
    "vehicle.yamaha.yzf",
    "vehicle.harley-davidson.low_rider",
];

const PEDESTRIANS: u32 = 12;

const COLORS: [&str; 5] = ["255,255,255", "0,0,0", "200,20,20", "20,40,200", "120,120,120"];

/// 默认限速 (km/h)
const SPEED_LIMIT_KMH: f64 = 30.0;

/// Mock 模拟器配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// spawn 时失败的蓝图 (支持 `*` 通配符)
    pub fail_blueprints: Vec<String>,
    /// 前 N 个 walker 控制器 spawn 失败
    pub fail_controllers: usize,
    /// destroy 失败的 actor IDs
    pub fail_destroy: Vec<ActorId>,
    /// 每个 tick 在正确帧之前先下发的过期帧数量
    pub stale_frames: u32,
    /// 从不下发数据的相机模态
    pub silent_cameras: Vec<CameraModality>,
    /// 每张地图的 spawn point 数量
    pub spawn_point_count: usize,
    /// 在 tick 调用线程内同步下发相机帧 (默认使用后台线程)
    pub inline_delivery: bool,
    /// 导航网格随机数种子
    pub seed: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fail_blueprints: Vec::new(),
            fail_controllers: 0,
            fail_destroy: Vec::new(),
            stale_frames: 0,
            silent_cameras: Vec::new(),
            spawn_point_count: 300,
            inline_delivery: false,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ActorKind {
    Vehicle { autopilot: Option<u16>, lights: bool },
    Walker,
    WalkerController { walker: ActorId, target: Option<Location>, speed: f64 },
    Camera { parent: ActorId },
}

#[derive(Debug, Clone)]
struct MockActor {
    type_id: String,
    attributes: BTreeMap<String, String>,
    kind: ActorKind,
    transform: Transform,
    velocity: Vector3,
    acceleration: Vector3,
}

struct WorldState {
    connected: bool,
    settings: WorldSettings,
    map: String,
    frame: FrameId,
    elapsed: f64,
    weather: WeatherPreset,
    cross_factor: f64,
    traffic_manager: Option<TrafficManagerSettings>,
    actors: BTreeMap<ActorId, MockActor>,
    feeds: HashMap<ActorId, Arc<CameraFeed>>,
    next_actor_id: ActorId,
    controllers_spawned: usize,
    rng: ChaCha8Rng,
}

type Delivery = (SensorDataCallback, SensorPacket);

/// Mock 模拟器
pub struct MockSimulator {
    config: MockConfig,
    library: Vec<Blueprint>,
    state: Mutex<WorldState>,
    delivery: Option<mpsc::Sender<Delivery>>,
}

impl MockSimulator {
    /// 创建默认 mock 模拟器
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 模拟器
    pub fn with_config(config: MockConfig) -> Self {
        let delivery = if config.inline_delivery {
            None
        } else {
            let (tx, rx) = mpsc::channel::<Delivery>();
            // 模拟服务器的传感器推送线程；MockSimulator 释放后退出
            thread::spawn(move || {
                while let Ok((callback, packet)) = rx.recv() {
                    callback(packet);
                }
            });
            Some(tx)
        };

        let state = WorldState {
            connected: false,
            settings: WorldSettings::default(),
            map: MOCK_MAPS[MOCK_MAPS.len() - 1].to_string(),
            frame: 0,
            elapsed: 0.0,
            weather: WeatherPreset::Default,
            cross_factor: 0.0,
            traffic_manager: None,
            actors: BTreeMap::new(),
            feeds: HashMap::new(),
            // 从 1000 开始，便于识别
            next_actor_id: 1000,
            controllers_spawned: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        };

        Self {
            config,
            library: blueprint_library(),
            state: Mutex::new(state),
            delivery,
        }
    }

    /// 已连接的 mock 模拟器
    pub fn connected(config: MockConfig) -> Self {
        let sim = Self::with_config(config);
        sim.state().connected = true;
        sim
    }

    /// 当前存活的 actor 数量
    pub fn actor_count(&self) -> usize {
        self.state().actors.len()
    }

    /// 当前存活的 actor IDs
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.state().actors.keys().copied().collect()
    }

    /// 类型匹配 `pattern` 的存活 actor 数量
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.state()
            .actors
            .values()
            .filter(|a| wildcard_match(pattern, &a.type_id))
            .count()
    }

    /// 当前帧号
    pub fn frame(&self) -> FrameId {
        self.state().frame
    }

    pub fn current_map(&self) -> String {
        self.state().map.clone()
    }

    pub fn current_weather(&self) -> WeatherPreset {
        self.state().weather
    }

    pub fn traffic_manager(&self) -> Option<TrafficManagerSettings> {
        self.state().traffic_manager
    }

    pub fn pedestrians_cross_factor(&self) -> f64 {
        self.state().cross_factor
    }

    /// 交由交通管理器驾驶的车辆
    pub fn autopilot_vehicles(&self) -> Vec<ActorId> {
        self.state()
            .actors
            .iter()
            .filter(|(_, a)| matches!(a.kind, ActorKind::Vehicle { autopilot: Some(_), .. }))
            .map(|(id, _)| *id)
            .collect()
    }

    /// 已开灯的车辆数量
    pub fn vehicles_with_lights(&self) -> usize {
        self.state()
            .actors
            .values()
            .filter(|a| matches!(a.kind, ActorKind::Vehicle { lights: true, .. }))
            .count()
    }

    /// 已启动的 walker 控制器数量
    pub fn started_walkers(&self) -> usize {
        self.state()
            .actors
            .values()
            .filter(|a| matches!(a.kind, ActorKind::WalkerController { target: Some(_), .. }))
            .count()
    }

    fn state(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connected_state(&self) -> Result<MutexGuard<'_, WorldState>> {
        let state = self.state();
        if state.connected {
            Ok(state)
        } else {
            Err(ActorFactoryError::not_connected())
        }
    }

    fn blueprint(&self, id: &str) -> Option<&Blueprint> {
        self.library.iter().find(|bp| bp.id == id)
    }

    fn spawn_one(&self, state: &mut WorldState, command: &SpawnCommand) -> CommandResponse {
        let id = command.blueprint.id.as_str();

        if self.blueprint(id).is_none() {
            return CommandResponse::failed(format!("blueprint '{id}' not found"));
        }
        if self.config.fail_blueprints.iter().any(|p| wildcard_match(p, id)) {
            return CommandResponse::failed(format!("injected spawn failure for '{id}'"));
        }

        if let Some(parent) = command.parent {
            if !state.actors.contains_key(&parent) {
                return CommandResponse::failed(format!("parent actor {parent} not found"));
            }
        }

        let kind = if id.starts_with("vehicle.") {
            let location = command.transform.location;
            let occupied = state.actors.values().any(|a| {
                matches!(a.kind, ActorKind::Vehicle { .. }) && a.transform.location.distance(&location) < 1.0
            });
            if occupied {
                return CommandResponse::failed("spawn failed because of collision at spawn position");
            }
            if let Some(port) = command.autopilot {
                if state.traffic_manager.map(|tm| tm.port) != Some(port) {
                    debug!(port, "autopilot requested on an unconfigured traffic manager port");
                }
            }
            ActorKind::Vehicle {
                autopilot: command.autopilot,
                lights: false,
            }
        } else if id.starts_with("walker.") {
            ActorKind::Walker
        } else if id == "controller.ai.walker" {
            let Some(walker) = command.parent else {
                return CommandResponse::failed("walker controller requires a parent walker");
            };
            state.controllers_spawned += 1;
            if state.controllers_spawned <= self.config.fail_controllers {
                return CommandResponse::failed("injected controller failure");
            }
            ActorKind::WalkerController {
                walker,
                target: None,
                speed: 0.0,
            }
        } else if let Some(modality) = CameraModality::from_blueprint_id(id) {
            let Some(parent) = command.parent else {
                return CommandResponse::failed("camera requires a parent actor");
            };
            let dim = |key: &str, default: u32| {
                command
                    .blueprint
                    .attribute(key)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default)
            };
            let feed = CameraFeed::new(modality, dim("image_size_x", 800), dim("image_size_y", 600));
            let actor_id = state.next_actor_id;
            state.feeds.insert(actor_id, Arc::new(feed));
            ActorKind::Camera { parent }
        } else {
            return CommandResponse::failed(format!("'{id}' cannot be spawned"));
        };

        let actor_id = state.next_actor_id;
        state.next_actor_id += 1;
        state.actors.insert(
            actor_id,
            MockActor {
                type_id: id.to_string(),
                attributes: command.blueprint.attribute_values(),
                kind,
                transform: command.transform,
                velocity: Vector3::default(),
                acceleration: Vector3::default(),
            },
        );
        trace!(actor_id, blueprint = id, "mock actor spawned");
        CommandResponse::spawned(actor_id)
    }

    /// 推进一步：积分运动并下发相机帧
    fn step(&self, state: &mut WorldState) -> Snapshot {
        let dt = state.settings.fixed_delta_seconds.unwrap_or(0.05);
        state.frame += 1;
        state.elapsed += dt;

        let speed_diff = state
            .traffic_manager
            .map_or(0.0, |tm| tm.speed_difference_percent);
        let cruise = (SPEED_LIMIT_KMH / 3.6 * (1.0 - speed_diff / 100.0)).max(0.0);

        let controllers: Vec<(ActorId, Location, f64)> = state
            .actors
            .values()
            .filter_map(|a| match a.kind {
                ActorKind::WalkerController {
                    walker,
                    target: Some(target),
                    speed,
                } => Some((walker, target, speed)),
                _ => None,
            })
            .collect();

        for actor in state.actors.values_mut() {
            if let ActorKind::Vehicle {
                autopilot: Some(_), ..
            } = actor.kind
            {
                let fwd = actor.transform.forward_vector();
                let velocity = Vector3::new(fwd.x * cruise, fwd.y * cruise, fwd.z * cruise);
                advance(actor, velocity, dt);
            }
        }

        for (walker, target, speed) in controllers {
            if let Some(actor) = state.actors.get_mut(&walker) {
                let here = actor.transform.location;
                let remaining = here.distance(&target);
                let velocity = if remaining < 0.5 || speed <= 0.0 {
                    Vector3::default()
                } else {
                    let k = speed.min(remaining / dt) / remaining;
                    Vector3::new((target.x - here.x) * k, (target.y - here.y) * k, 0.0)
                };
                advance(actor, velocity, dt);
            }
        }

        self.deliver(state);

        Snapshot {
            frame: state.frame,
            elapsed_seconds: state.elapsed,
        }
    }

    fn deliver(&self, state: &WorldState) {
        let frame = state.frame;
        for feed in state.feeds.values() {
            if self.config.silent_cameras.contains(&feed.modality) {
                continue;
            }
            let Some((sensor_id, callback)) = feed.subscriber() else {
                continue;
            };

            let stale = (1..=u64::from(self.config.stale_frames))
                .rev()
                .filter(|k| *k < frame)
                .map(|k| frame - k);
            for tagged in stale.chain(std::iter::once(frame)) {
                let packet = feed.render(sensor_id.clone(), tagged, state.elapsed);
                match &self.delivery {
                    Some(tx) => {
                        if tx.send((callback.clone(), packet)).is_err() {
                            warn!("mock delivery thread is gone");
                        }
                    }
                    None => callback(packet),
                }
            }
        }
    }

    fn clear_world(state: &mut WorldState) {
        for feed in state.feeds.values() {
            feed.close();
        }
        state.feeds.clear();
        state.actors.clear();
        state.traffic_manager = None;
    }
}

fn advance(actor: &mut MockActor, velocity: Vector3, dt: f64) {
    let prev = actor.velocity;
    actor.acceleration = Vector3::new(
        (velocity.x - prev.x) / dt,
        (velocity.y - prev.y) / dt,
        (velocity.z - prev.z) / dt,
    );
    actor.velocity = velocity;
    actor.transform.location.x += velocity.x * dt;
    actor.transform.location.y += velocity.y * dt;
    actor.transform.location.z += velocity.z * dt;
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// 蓝图库 (顺序固定)
fn blueprint_library() -> Vec<Blueprint> {
    let mut library = Vec::new();

    for (i, id) in FOUR_WHEELED.iter().chain(SPECIAL_VEHICLES.iter()).enumerate() {
        library.push(
            Blueprint::new(*id)
                .with_attribute("number_of_wheels", BlueprintAttribute::fixed("4"))
                .with_attribute(
                    "color",
                    BlueprintAttribute::with_recommended(COLORS.iter().cycle().skip(i).take(3).copied()),
                )
                .with_attribute("role_name", BlueprintAttribute::new("")),
        );
    }
    for id in TWO_WHEELED {
        library.push(
            Blueprint::new(id)
                .with_attribute("number_of_wheels", BlueprintAttribute::fixed("2"))
                .with_attribute("color", BlueprintAttribute::with_recommended(COLORS))
                .with_attribute("driver_id", BlueprintAttribute::with_recommended(["0", "1", "2"]))
                .with_attribute("role_name", BlueprintAttribute::new("")),
        );
    }
    for n in 1..=PEDESTRIANS {
        let mut bp = Blueprint::new(format!("walker.pedestrian.{n:04}"))
            .with_attribute("is_invincible", BlueprintAttribute::new("true"))
            .with_attribute("role_name", BlueprintAttribute::new(""));
        // 最后一个行人模型没有速度属性
        if n < PEDESTRIANS {
            bp = bp.with_attribute("speed", BlueprintAttribute::with_recommended(["0.0", "1.4", "2.5"]));
        }
        library.push(bp);
    }
    for modality in CameraModality::RIG {
        library.push(
            Blueprint::new(modality.blueprint_id())
                .with_attribute("image_size_x", BlueprintAttribute::new("800"))
                .with_attribute("image_size_y", BlueprintAttribute::new("600"))
                .with_attribute("fov", BlueprintAttribute::new("90"))
                .with_attribute("role_name", BlueprintAttribute::new("")),
        );
    }
    library.push(Blueprint::new("controller.ai.walker"));
    library
}

/// 地图的 spawn point 网格 (确定性)
fn spawn_grid(map: &str, count: usize) -> Vec<Transform> {
    let offset = map.bytes().map(f64::from).sum::<f64>();
    (0..count)
        .map(|i| {
            let row = (i / 20) as f64;
            let col = (i % 20) as f64;
            Transform::new(
                Location::new(offset + col * 12.0, row * 12.0, 0.3),
                Rotation::new(0.0, ((i % 4) * 90) as f64, 0.0),
            )
        })
        .collect()
}

impl SimulatorClient for MockSimulator {
    #[instrument(name = "mock_sim_connect", skip(self, timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let _ = timeout;
        self.state().connected = true;
        info!("connected to mock simulator");
        Ok(())
    }

    async fn available_maps(&self) -> Result<Vec<String>> {
        self.connected_state()?;
        Ok(MOCK_MAPS.iter().map(|m| format!("/Game/Carla/Maps/{m}")).collect())
    }

    async fn world_settings(&self) -> Result<WorldSettings> {
        Ok(self.connected_state()?.settings)
    }

    #[instrument(name = "mock_sim_apply_settings", skip(self, settings), fields(sync = settings.synchronous_mode))]
    async fn apply_settings(&self, settings: WorldSettings) -> Result<FrameId> {
        let mut state = self.connected_state()?;
        state.settings = settings;
        Ok(state.frame)
    }

    #[instrument(name = "mock_sim_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<()> {
        let mut state = self.connected_state()?;
        let known = MOCK_MAPS.iter().find(|m| map.ends_with(*m)).ok_or_else(|| {
            ActorFactoryError::UnknownMap {
                map: map.to_string(),
            }
        })?;
        Self::clear_world(&mut state);
        state.map = known.to_string();
        state.frame += 1;
        Ok(())
    }

    async fn tick(&self) -> Result<Snapshot> {
        let mut state = self.connected_state()?;
        Ok(self.step(&mut state))
    }

    async fn blueprints(&self, filter: &str) -> Result<Vec<Blueprint>> {
        self.connected_state()?;
        Ok(self
            .library
            .iter()
            .filter(|bp| bp.matches(filter))
            .cloned()
            .collect())
    }

    async fn find_blueprint(&self, id: &str) -> Result<Option<Blueprint>> {
        self.connected_state()?;
        Ok(self.blueprint(id).cloned())
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        let state = self.connected_state()?;
        Ok(spawn_grid(&state.map, self.config.spawn_point_count))
    }

    async fn random_navigation_location(&self) -> Result<Option<Location>> {
        let mut state = self.connected_state()?;
        let x = state.rng.random_range(-100.0..100.0);
        let y = state.rng.random_range(-100.0..100.0);
        Ok(Some(Location::new(x, y, 1.0)))
    }

    async fn set_pedestrians_cross_factor(&self, factor: f64) -> Result<()> {
        self.connected_state()?.cross_factor = factor;
        Ok(())
    }

    async fn set_weather(&self, weather: WeatherPreset) -> Result<()> {
        self.connected_state()?.weather = weather;
        Ok(())
    }

    async fn configure_traffic_manager(&self, settings: TrafficManagerSettings) -> Result<()> {
        self.connected_state()?.traffic_manager = Some(settings);
        Ok(())
    }

    async fn update_vehicle_lights(&self, actor_ids: &[ActorId], enabled: bool) -> Result<()> {
        let mut state = self.connected_state()?;
        for id in actor_ids {
            match state.actors.get_mut(id).map(|a| &mut a.kind) {
                Some(ActorKind::Vehicle { lights, .. }) => *lights = enabled,
                _ => return Err(ActorFactoryError::ActorNotFound { actor_id: *id }),
            }
        }
        Ok(())
    }

    #[instrument(name = "mock_sim_apply_batch", skip(self, commands), fields(commands = commands.len(), tick))]
    async fn apply_batch_sync(
        &self,
        commands: Vec<SpawnCommand>,
        tick: bool,
    ) -> Result<Vec<CommandResponse>> {
        let mut state = self.connected_state()?;
        let responses: Vec<CommandResponse> = commands
            .iter()
            .map(|command| self.spawn_one(&mut state, command))
            .collect();
        if tick {
            self.step(&mut state);
        }
        Ok(responses)
    }

    async fn start_walker(&self, controller_id: ActorId, target: Location, max_speed: f64) -> Result<()> {
        let mut state = self.connected_state()?;
        match state.actors.get_mut(&controller_id).map(|a| &mut a.kind) {
            Some(ActorKind::WalkerController { target: t, speed, .. }) => {
                *t = Some(target);
                *speed = max_speed;
                Ok(())
            }
            _ => Err(ActorFactoryError::ActorNotFound {
                actor_id: controller_id,
            }),
        }
    }

    async fn stop_walker(&self, controller_id: ActorId) -> Result<()> {
        let mut state = self.connected_state()?;
        if let Some(ActorKind::WalkerController { target, .. }) =
            state.actors.get_mut(&controller_id).map(|a| &mut a.kind)
        {
            *target = None;
        }
        Ok(())
    }

    async fn actor_state(&self, actor_id: ActorId) -> Result<ActorState> {
        let state = self.connected_state()?;
        let actor = state
            .actors
            .get(&actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })?;

        Ok(ActorState {
            id: actor_id,
            type_id: actor.type_id.clone(),
            attributes: actor.attributes.clone(),
            transform: actor.transform,
            velocity: actor.velocity,
            acceleration: actor.acceleration,
            angular_velocity: Vector3::default(),
        })
    }

    async fn vehicle_status(&self, actor_id: ActorId) -> Result<VehicleStatus> {
        let state = self.connected_state()?;
        match state.actors.get(&actor_id).map(|a| a.kind) {
            Some(ActorKind::Vehicle { .. }) => {
                // 每 200 帧中有 50 帧停在路口
                let phase = state.frame % 200;
                let traffic_light = match phase {
                    150..=169 => Some(TrafficLightState::Red),
                    170..=189 => Some(TrafficLightState::Green),
                    190..=199 => Some(TrafficLightState::Yellow),
                    _ => None,
                };
                Ok(VehicleStatus {
                    traffic_light,
                    speed_limit: SPEED_LIMIT_KMH,
                })
            }
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    #[instrument(name = "mock_sim_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if self.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "injected destroy failure".into(),
            });
        }

        let mut state = self.state();
        // 幂等：即使不存在也返回 Ok
        if state.actors.remove(&actor_id).is_some() {
            if let Some(feed) = state.feeds.remove(&actor_id) {
                feed.close();
            }
            trace!(actor_id, "mock actor destroyed");
        }
        Ok(())
    }

    fn sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: SensorId,
        modality: CameraModality,
    ) -> Option<Box<dyn SensorSource>> {
        let state = self.state();
        let feed = state.feeds.get(&actor_id)?;
        if feed.modality != modality {
            warn!(actor_id, expected = %modality, actual = %feed.modality, "camera modality mismatch");
            return None;
        }
        Some(Box::new(MockCamera::new(sensor_id, feed.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    async fn connected() -> MockSimulator {
        let mut sim = MockSimulator::with_config(MockConfig {
            inline_delivery: true,
            ..MockConfig::default()
        });
        sim.connect("localhost", 2000, Duration::from_secs(1)).await.unwrap();
        sim.load_world("Town01_Opt").await.unwrap();
        sim
    }

    async fn vehicle(sim: &MockSimulator, at: usize) -> ActorId {
        let points = sim.spawn_points().await.unwrap();
        let bp = sim.find_blueprint("vehicle.audi.a2").await.unwrap().unwrap();
        sim.apply_batch_sync(vec![SpawnCommand::new(bp, points[at])], false)
            .await
            .unwrap()
            .remove(0)
            .into_result()
            .unwrap()
    }

    #[tokio::test]
    async fn requires_connection() {
        let sim = MockSimulator::new();
        assert!(matches!(sim.tick().await, Err(ActorFactoryError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn unknown_map_rejected() {
        let sim = connected().await;
        assert!(matches!(
            sim.load_world("Atlantis").await,
            Err(ActorFactoryError::UnknownMap { .. })
        ));
        assert!(sim.load_world("/Game/Carla/Maps/Town10HD_Opt").await.is_ok());
        assert_eq!(sim.current_map(), "Town10HD_Opt");
    }

    #[tokio::test]
    async fn batch_returns_one_response_per_command() {
        let sim = connected().await;
        let points = sim.spawn_points().await.unwrap();
        let bp = sim.find_blueprint("vehicle.tesla.model3").await.unwrap().unwrap();

        let responses = sim
            .apply_batch_sync(
                vec![
                    SpawnCommand::new(bp.clone(), points[0]),
                    // same spawn point: collision
                    SpawnCommand::new(bp.clone(), points[0]),
                    SpawnCommand::new(Blueprint::new("vehicle.unknown"), points[1]),
                    SpawnCommand::new(bp, points[2]).with_autopilot(8000),
                ],
                false,
            )
            .await
            .unwrap();

        assert_eq!(responses.len(), 4);
        assert!(!responses[0].has_error());
        assert!(responses[1].has_error());
        assert!(responses[2].has_error());
        assert!(!responses[3].has_error());
        assert_eq!(sim.autopilot_vehicles().len(), 1);
    }

    #[tokio::test]
    async fn injected_blueprint_failure() {
        let mut sim = MockSimulator::with_config(MockConfig {
            fail_blueprints: vec!["walker.*".into()],
            ..MockConfig::default()
        });
        sim.connect("localhost", 2000, Duration::from_secs(1)).await.unwrap();
        let bp = sim.find_blueprint("walker.pedestrian.0001").await.unwrap().unwrap();
        let responses = sim
            .apply_batch_sync(vec![SpawnCommand::new(bp, Transform::default())], false)
            .await
            .unwrap();
        assert!(responses[0].has_error());
    }

    #[tokio::test]
    async fn autopilot_vehicle_moves_on_tick() {
        let sim = connected().await;
        sim.apply_settings(WorldSettings::synchronous(20)).await.unwrap();
        let points = sim.spawn_points().await.unwrap();
        let bp = sim.find_blueprint("vehicle.audi.tt").await.unwrap().unwrap();
        let id = sim
            .apply_batch_sync(vec![SpawnCommand::new(bp, points[0]).with_autopilot(8000)], true)
            .await
            .unwrap()[0]
            .actor_id
            .unwrap();

        let before = sim.actor_state(id).await.unwrap();
        sim.tick().await.unwrap();
        let after = sim.actor_state(id).await.unwrap();
        assert!(after.location().distance(&before.location()) > 0.1);
        assert!(after.speed_kmh() > 20.0);
    }

    #[tokio::test]
    async fn camera_receives_frame_of_each_tick() {
        let sim = connected().await;
        let parent = vehicle(&sim, 0).await;
        let bp = sim.find_blueprint("sensor.camera.depth").await.unwrap().unwrap();
        let cam = sim
            .apply_batch_sync(vec![SpawnCommand::new(bp, Transform::default()).attached_to(parent)], false)
            .await
            .unwrap()[0]
            .actor_id
            .unwrap();

        assert!(sim.sensor_source(cam, "dep".into(), CameraModality::Rgb).is_none());
        let source = sim.sensor_source(cam, "dep".into(), CameraModality::Depth).unwrap();

        let last = Arc::new(AtomicU64::new(0));
        let seen = last.clone();
        source.listen(Arc::new(move |packet| seen.store(packet.frame, Ordering::SeqCst)));

        let snapshot = sim.tick().await.unwrap();
        assert_eq!(last.load(Ordering::SeqCst), snapshot.frame);

        sim.destroy_actor(cam).await.unwrap();
        assert!(!source.is_listening());
    }

    #[tokio::test]
    async fn camera_without_parent_fails() {
        let sim = connected().await;
        let bp = sim.find_blueprint("sensor.camera.rgb").await.unwrap().unwrap();
        let responses = sim
            .apply_batch_sync(vec![SpawnCommand::new(bp, Transform::default()).attached_to(42)], false)
            .await
            .unwrap();
        assert!(responses[0].error.as_deref().unwrap().contains("parent"));
    }

    #[tokio::test]
    async fn walker_controller_failures_and_start() {
        let mut sim = MockSimulator::with_config(MockConfig {
            fail_controllers: 1,
            ..MockConfig::default()
        });
        sim.connect("localhost", 2000, Duration::from_secs(1)).await.unwrap();
        let bp = sim.find_blueprint("walker.pedestrian.0002").await.unwrap().unwrap();
        let walkers: Vec<ActorId> = sim
            .apply_batch_sync(
                vec![
                    SpawnCommand::new(bp.clone(), Transform::from_location(Location::new(0.0, 0.0, 1.0))),
                    SpawnCommand::new(bp, Transform::from_location(Location::new(5.0, 0.0, 1.0))),
                ],
                false,
            )
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.into_result().unwrap())
            .collect();

        let controller_bp = Blueprint::new("controller.ai.walker");
        let responses = sim
            .apply_batch_sync(
                walkers
                    .iter()
                    .map(|&w| SpawnCommand::new(controller_bp.clone(), Transform::default()).attached_to(w))
                    .collect(),
                false,
            )
            .await
            .unwrap();
        assert!(responses[0].error.is_some());
        let controller = responses[1].actor_id.unwrap();
        sim.start_walker(controller, Location::new(50.0, 0.0, 1.0), 1.4).await.unwrap();
        assert_eq!(sim.started_walkers(), 1);

        sim.tick().await.unwrap();
        let state = sim.actor_state(walkers[1]).await.unwrap();
        assert!(state.location().x > 5.0);
    }

    #[tokio::test]
    async fn destroy_is_idempotent_unless_injected() {
        let mut sim = MockSimulator::with_config(MockConfig {
            fail_destroy: vec![1001],
            ..MockConfig::default()
        });
        sim.connect("localhost", 2000, Duration::from_secs(1)).await.unwrap();
        let a = vehicle(&sim, 0).await;
        let b = vehicle(&sim, 1).await;
        assert_eq!((a, b), (1000, 1001));

        sim.destroy_actor(a).await.unwrap();
        sim.destroy_actor(a).await.unwrap();
        assert!(sim.destroy_actor(b).await.is_err());
        assert_eq!(sim.actor_count(), 1);
    }

    #[tokio::test]
    async fn library_filters() {
        let sim = connected().await;
        let vehicles = sim.blueprints("vehicle.*").await.unwrap();
        assert_eq!(vehicles.len(), FOUR_WHEELED.len() + SPECIAL_VEHICLES.len() + TWO_WHEELED.len());
        assert_eq!(vehicles[1].id, "vehicle.audi.etron");

        let walkers = sim.blueprints("walker.pedestrian.*").await.unwrap();
        assert_eq!(walkers.len(), PEDESTRIANS as usize);
        assert_eq!(walkers[0].recommended_values("speed"), ["0.0", "1.4", "2.5"]);
        assert!(!walkers.last().unwrap().has_attribute("speed"));
    }
}
