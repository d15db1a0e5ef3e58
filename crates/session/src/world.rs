//! SyncWorld - 同步世界会话
//!
//! 进入时加载地图并布置交通参与者，每个 tick 采集一帧，
//! 退出时按顺序销毁全部 actor。

use std::sync::Arc;
use std::time::Duration;

use actor_factory::{ActorFactory, SimulatorClient, TeardownReport};
use contracts::{
    ActorId, ActorState, Blueprint, CameraModality, FrameId, FrameMeta, FrameSample,
    SensorId, SpawnCommand, SyncStats, Transform, WorldRoster,
};
use ingestion::IngestionPipeline;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sync_engine::TickSynchronizer;
use tracing::{error, info, instrument, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::population::{
    random_vehicle_blueprint, random_walker_blueprint, shuffled_spawn_points, vehicle_pool,
};

/// 会话退出时的汇总
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    /// 预热之后每个 tick 的操作车元数据
    pub frame_meta: Vec<FrameMeta>,
    /// 成功 spawn 的背景车辆数
    pub vehicles: usize,
    /// 成功 spawn 并启动的行人数
    pub walkers: usize,
    /// 已执行的 tick 数 (含预热)
    pub ticks: u64,
    pub teardown: TeardownReport,
}

/// 同步世界会话
///
/// Rust 没有异步析构，因此必须显式调用 [`SyncWorld::exit`]，
/// 或使用保证退出的 [`SyncWorld::scope`]。
pub struct SyncWorld<C: SimulatorClient> {
    client: Arc<C>,
    factory: ActorFactory<C>,
    config: SessionConfig,
    rng: ChaCha8Rng,
    roster: WorldRoster,
    ingestion: IngestionPipeline,
    synchronizer: TickSynchronizer,
    frame: FrameId,
    ticks: u64,
    last_stats: SyncStats,
    frame_meta: Vec<FrameMeta>,
    exited: bool,
}

impl<C: SimulatorClient> SyncWorld<C> {
    /// 进入会话：加载地图并布置操作车、相机、车辆、行人
    ///
    /// 布置中途失败时，已 spawn 的 actor 会被销毁后再返回错误。
    ///
    /// # Errors
    /// 地图加载失败、操作车 spawn 失败、模拟器请求失败
    #[instrument(
        name = "session_enter",
        skip(client, config),
        fields(map = %config.map, seed = config.seed, vehicles = config.n_vehicles, walkers = config.n_walkers)
    )]
    pub async fn enter(client: Arc<C>, config: SessionConfig) -> Result<Self> {
        let mut world = Self {
            factory: ActorFactory::new(client.clone()),
            client,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            roster: WorldRoster::new(),
            ingestion: IngestionPipeline::new(),
            synchronizer: TickSynchronizer::new(Vec::new()),
            frame: 0,
            ticks: 0,
            last_stats: SyncStats::default(),
            frame_meta: Vec::new(),
            exited: false,
        };

        if let Err(e) = world.populate().await {
            error!(error = %e, "failed to set up world, tearing down");
            world.exit().await;
            return Err(e);
        }
        Ok(world)
    }

    /// 在 enter 与 exit 之间运行 `body`，无论 body 是否出错都会退出
    pub async fn scope<T, E, F>(
        client: Arc<C>,
        config: SessionConfig,
        body: F,
    ) -> std::result::Result<(T, SessionSummary), E>
    where
        F: AsyncFnOnce(&mut SyncWorld<C>) -> std::result::Result<T, E>,
        E: From<SessionError>,
    {
        let mut world = Self::enter(client, config).await?;
        let outcome = body(&mut world).await;
        let summary = world.exit().await;
        outcome.map(|value| (value, summary))
    }

    async fn populate(&mut self) -> Result<()> {
        self.load_world().await?;

        let points = self.client.spawn_points().await?;
        let points = shuffled_spawn_points(points, self.config.n_vehicles as usize, &mut self.rng);
        let Some((&operator_point, vehicle_points)) = points.split_first() else {
            return Err(SessionError::OperatorSpawn {
                message: "map has no spawn points".into(),
            });
        };

        self.spawn_operator(operator_point).await?;
        self.client.tick().await?;
        self.spawn_vehicles(vehicle_points).await?;
        self.client.tick().await?;

        let mut lit = self.roster.vehicles.clone();
        lit.extend(self.roster.operator);
        self.client.update_vehicle_lights(&lit, true).await?;

        self.spawn_walkers().await?;
        self.client.set_weather(self.config.weather).await?;

        metrics::gauge!("scene_recorder_vehicles_spawned").set(self.roster.vehicles.len() as f64);
        metrics::gauge!("scene_recorder_walkers_spawned").set(self.roster.walkers.len() as f64);
        metrics::gauge!("scene_recorder_cameras_spawned").set(self.roster.cameras.len() as f64);

        info!(
            vehicles = self.roster.vehicles.len(),
            walkers = self.roster.walkers.len(),
            cameras = self.roster.cameras.len(),
            "world populated"
        );
        Ok(())
    }

    async fn load_world(&mut self) -> Result<()> {
        self.client.load_world(&self.config.map).await?;
        self.client
            .configure_traffic_manager(self.config.traffic_manager())
            .await?;
        self.client
            .set_pedestrians_cross_factor(self.config.crossing_factor)
            .await?;
        Ok(())
    }

    #[instrument(name = "session_spawn_operator", skip(self, spawn_point))]
    async fn spawn_operator(&mut self, spawn_point: Transform) -> Result<()> {
        let vehicles = self.client.blueprints("vehicle").await?;
        let blueprint = vehicles
            .into_iter()
            .nth(1)
            .ok_or_else(|| SessionError::NoBlueprints {
                filter: "vehicle".into(),
            })?;

        let command = SpawnCommand::new(blueprint, spawn_point).with_autopilot(self.config.tm_port);
        let mut outcome = self
            .factory
            .spawn_batch("operator", vec![((), command)], true)
            .await?;
        let operator = match (outcome.spawned.pop(), outcome.failed.pop()) {
            (Some((_, actor_id)), _) => actor_id,
            (None, Some((_, message))) => return Err(SessionError::OperatorSpawn { message }),
            (None, None) => {
                return Err(SessionError::OperatorSpawn {
                    message: "no response".into(),
                })
            }
        };
        self.roster.set_operator(operator);

        self.spawn_cameras(operator).await
    }

    async fn spawn_cameras(&mut self, operator: ActorId) -> Result<()> {
        let mut requests = Vec::with_capacity(CameraModality::RIG.len());
        for modality in CameraModality::RIG {
            let Some(mut blueprint) = self.client.find_blueprint(modality.blueprint_id()).await? else {
                warn!(%modality, "camera blueprint not found, camera left out of the rig");
                continue;
            };
            blueprint.set_attribute("image_size_x", self.config.img_w.to_string());
            blueprint.set_attribute("image_size_y", self.config.img_h.to_string());
            blueprint.set_attribute("fov", self.config.fov.to_string());
            let command = SpawnCommand::new(blueprint, self.config.camera_transform).attached_to(operator);
            requests.push((modality, command));
        }

        let outcome = self.factory.spawn_batch("camera", requests, true).await?;
        for (modality, message) in &outcome.failed {
            error!(%modality, error = %message, "camera spawn failed (operator)");
        }

        for (modality, actor_id) in outcome.spawned {
            let sensor_id = SensorId::new(modality.dir_name());
            self.roster.register_camera(sensor_id.clone(), modality, actor_id);
            match self.client.sensor_source(actor_id, sensor_id, modality) {
                Some(source) => self.ingestion.register_sensor_source(source)?,
                None => warn!(%modality, actor_id, "camera has no data source"),
            }
        }

        self.ingestion.start_all();
        self.synchronizer = TickSynchronizer::new(self.ingestion.queues());
        Ok(())
    }

    #[instrument(name = "session_spawn_vehicles", skip(self, spawn_points), fields(requested = spawn_points.len()))]
    async fn spawn_vehicles(&mut self, spawn_points: &[Transform]) -> Result<()> {
        let pool = vehicle_pool(self.client.blueprints("vehicle.*").await?);

        let mut requests = Vec::with_capacity(spawn_points.len());
        for &point in spawn_points {
            let blueprint = random_vehicle_blueprint(&pool, &mut self.rng)?;
            requests.push(((), SpawnCommand::new(blueprint, point).with_autopilot(self.config.tm_port)));
        }

        let outcome = self.factory.spawn_batch("vehicle", requests, true).await?;
        for actor_id in outcome.actor_ids() {
            self.roster.register_vehicle(actor_id);
        }
        Ok(())
    }

    #[instrument(name = "session_spawn_walkers", skip(self), fields(requested = self.config.n_walkers))]
    async fn spawn_walkers(&mut self) -> Result<()> {
        let pool = self.client.blueprints("walker.pedestrian.*").await?;

        let mut requests = Vec::with_capacity(self.config.n_walkers as usize);
        for _ in 0..self.config.n_walkers {
            let Some(location) = self.client.random_navigation_location().await? else {
                continue;
            };
            let (blueprint, speed) = random_walker_blueprint(
                &pool,
                self.config.running_factor,
                self.config.standing_factor,
                &mut self.rng,
            )?;
            requests.push((speed, SpawnCommand::new(blueprint, Transform::from_location(location))));
        }
        let walkers = self.factory.spawn_batch("walker", requests, true).await?;

        let controller_requests = walkers
            .spawned
            .iter()
            .map(|&(speed, walker_id)| {
                let command = SpawnCommand::new(Blueprint::new("controller.ai.walker"), Transform::default())
                    .attached_to(walker_id);
                ((walker_id, speed), command)
            })
            .collect();
        let controllers = self
            .factory
            .spawn_batch("walker_controller", controller_requests, true)
            .await?;

        // 控制器失败的行人直接销毁
        let orphans: Vec<ActorId> = controllers.failed.iter().map(|((walker_id, _), _)| *walker_id).collect();
        if !orphans.is_empty() {
            warn!(count = orphans.len(), "destroying walkers without controller");
            self.factory.destroy_all(&orphans).await;
        }

        for ((walker_id, speed), controller_id) in controllers.spawned {
            self.roster.register_walker(walker_id, controller_id, speed);
        }

        for walker in self.roster.walkers.clone() {
            let target = self.client.random_navigation_location().await?.unwrap_or_default();
            self.client.start_walker(walker.controller_id, target, walker.speed).await?;
        }
        Ok(())
    }

    /// 推进一个 tick 并采集一帧
    ///
    /// # Errors
    /// 模拟器请求失败，或相机帧同步失败 (超时 / 帧号超前)
    #[instrument(name = "session_tick", skip(self), fields(tick = self.ticks))]
    pub async fn tick(&mut self, timeout: Duration) -> Result<FrameSample> {
        if self.exited {
            return Err(SessionError::Closed);
        }
        let operator = self.roster.operator.ok_or_else(|| SessionError::OperatorSpawn {
            message: "session has no operator".into(),
        })?;

        let snapshot = self.client.tick().await?;
        self.frame = snapshot.frame;
        self.ticks += 1;

        let status = self.client.vehicle_status(operator).await?;
        let tracked = self.roster.tracked_actors();
        let mut actors: Vec<ActorState> = Vec::with_capacity(tracked.len());
        for actor_id in tracked {
            actors.push(self.client.actor_state(actor_id).await?);
        }
        let speed = actors.first().map_or(0.0, ActorState::speed_kmh);

        let meta = FrameMeta {
            frame: snapshot.frame,
            traffic_light: status.traffic_light,
            speed_limit: status.speed_limit,
            speed,
        };

        let synced = self.synchronizer.drain(snapshot.frame, timeout).await?;
        self.last_stats = synced.stats;

        if !self.in_warmup() {
            self.frame_meta.push(meta.clone());
        }

        Ok(FrameSample {
            frame: snapshot.frame,
            timestamp: snapshot.elapsed_seconds,
            meta,
            actors,
            cameras: synced.packets,
        })
    }

    /// 退出会话：停止相机并销毁全部 actor
    ///
    /// 销毁错误只记录不传播；多次调用安全。
    #[instrument(name = "session_exit", skip(self), fields(ticks = self.ticks))]
    pub async fn exit(&mut self) -> SessionSummary {
        let vehicles = self.roster.vehicles.len();
        let walkers = self.roster.walkers.len();

        self.ingestion.stop_all();
        info!(vehicles, walkers, cameras = self.roster.cameras.len(), "destroying actors");
        let teardown = self.factory.teardown(&mut self.roster).await;
        self.exited = true;

        SessionSummary {
            frame_meta: std::mem::take(&mut self.frame_meta),
            vehicles,
            walkers,
            ticks: self.ticks,
            teardown,
        }
    }

    /// 最近一次 tick 仍处于预热阶段
    pub fn in_warmup(&self) -> bool {
        self.ticks <= self.config.warmup_ticks
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn roster(&self) -> &WorldRoster {
        &self.roster
    }

    pub fn operator(&self) -> Option<ActorId> {
        self.roster.operator
    }

    /// 最近一次 tick 的帧号
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// 最近一次 tick 的同步统计
    pub fn last_stats(&self) -> SyncStats {
        self.last_stats
    }

    pub fn camera_count(&self) -> usize {
        self.synchronizer.camera_count()
    }
}
