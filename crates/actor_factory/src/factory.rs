//! ActorFactory 核心实现
//!
//! 批量 spawn：一次请求、逐条配对响应、记录失败；
//! 以及 actor 销毁 (错误只记录不传播)。

use std::sync::Arc;

use contracts::{ActorId, SpawnCommand, WorldRoster};
use tracing::{error, info, instrument, warn};

use crate::client::SimulatorClient;
use crate::error::{ActorFactoryError, Result};

/// 批量 spawn 结果
///
/// `T` 为调用方附带在每条命令上的上下文 (例如行人速度)。
#[derive(Debug)]
pub struct SpawnOutcome<T> {
    /// 成功的请求及其 actor ID (保持请求顺序)
    pub spawned: Vec<(T, ActorId)>,
    /// 失败的请求及错误信息
    pub failed: Vec<(T, String)>,
}

impl<T> SpawnOutcome<T> {
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.spawned.iter().map(|(_, id)| *id).collect()
    }
}

/// 销毁统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub destroyed: usize,
    pub failed: usize,
}

/// Actor Factory
///
/// 负责批量 spawn 与 teardown。
pub struct ActorFactory<C: SimulatorClient> {
    client: Arc<C>,
}

impl<C: SimulatorClient> Clone for ActorFactory<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<C: SimulatorClient> ActorFactory<C> {
    /// 创建新的 ActorFactory
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// 批量 spawn
    ///
    /// 单条命令失败不会影响其他命令；响应与请求一一配对。
    ///
    /// # Errors
    /// 请求本身失败，或响应数量与命令数量不一致
    #[instrument(
        name = "actor_factory_spawn_batch",
        skip(self, requests),
        fields(kind = %kind, commands = requests.len(), tick)
    )]
    pub async fn spawn_batch<T>(
        &self,
        kind: &str,
        requests: Vec<(T, SpawnCommand)>,
        tick: bool,
    ) -> Result<SpawnOutcome<T>>
    where
        T: Send,
    {
        let (tags, commands): (Vec<T>, Vec<SpawnCommand>) = requests.into_iter().unzip();
        let expected = commands.len();
        let responses = self.client.apply_batch_sync(commands, tick).await?;

        if responses.len() != expected {
            return Err(ActorFactoryError::simulator(format!(
                "batch of {expected} commands answered with {} responses",
                responses.len()
            )));
        }

        let mut outcome = SpawnOutcome {
            spawned: Vec::with_capacity(expected),
            failed: Vec::new(),
        };
        for (tag, response) in tags.into_iter().zip(responses) {
            match response.into_result() {
                Ok(actor_id) => outcome.spawned.push((tag, actor_id)),
                Err(message) => outcome.failed.push((tag, message)),
            }
        }

        if !outcome.failed.is_empty() {
            metrics::counter!("scene_recorder_spawn_failures_total", "kind" => kind.to_string())
                .increment(outcome.failed.len() as u64);
            warn!(
                failed = outcome.failed.len(),
                first_error = %outcome.failed[0].1,
                "some spawn commands failed"
            );
        }
        info!(spawned = outcome.spawned.len(), "batch spawned");

        Ok(outcome)
    }

    /// 按顺序销毁 actors
    ///
    /// 错误只记录日志，不会中断后续销毁。
    #[instrument(name = "actor_factory_destroy_all", skip(self, actor_ids), fields(count = actor_ids.len()))]
    pub async fn destroy_all(&self, actor_ids: &[ActorId]) -> TeardownReport {
        let mut report = TeardownReport::default();
        for &actor_id in actor_ids {
            if self.destroy_actor_safe(actor_id).await {
                report.destroyed += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// 销毁名册中的所有 actors 并清空名册
    ///
    /// # 幂等性
    /// 多次调用安全，第二次调用时名册已为空。
    #[instrument(
        name = "actor_factory_teardown",
        skip(self, roster),
        fields(vehicles = roster.vehicles.len(), walkers = roster.walkers.len(), cameras = roster.cameras.len())
    )]
    pub async fn teardown(&self, roster: &mut WorldRoster) -> TeardownReport {
        for walker in &roster.walkers {
            if let Err(e) = self.client.stop_walker(walker.controller_id).await {
                warn!(controller_id = walker.controller_id, error = %e, "failed to stop walker");
            }
        }

        let report = self.destroy_all(&roster.teardown_order()).await;
        roster.clear();

        if report.failed > 0 {
            warn!(destroyed = report.destroyed, failed = report.failed, "teardown completed with errors");
        } else {
            info!(destroyed = report.destroyed, "teardown completed");
        }
        report
    }

    /// 安全销毁 actor（忽略错误，仅记录日志）
    async fn destroy_actor_safe(&self, actor_id: ActorId) -> bool {
        match self.client.destroy_actor(actor_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(actor_id, error = %e, "failed to destroy actor");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock_client::{MockConfig, MockSimulator};
    use contracts::{Blueprint, CameraModality, Transform};

    async fn factory(config: MockConfig) -> ActorFactory<MockSimulator> {
        let mut sim = MockSimulator::with_config(config);
        sim.connect("localhost", 2000, Duration::from_secs(1)).await.unwrap();
        ActorFactory::new(Arc::new(sim))
    }

    #[tokio::test]
    async fn batch_pairs_responses_with_requests() {
        let factory = factory(MockConfig::default()).await;
        let points = factory.client().spawn_points().await.unwrap();
        let bp = Blueprint::new("vehicle.audi.a2");

        let outcome = factory
            .spawn_batch(
                "vehicle",
                vec![
                    ("a", SpawnCommand::new(bp.clone(), points[0])),
                    ("b", SpawnCommand::new(Blueprint::new("vehicle.nope"), points[1])),
                    ("c", SpawnCommand::new(bp, points[2])),
                ],
                false,
            )
            .await
            .unwrap();

        let spawned: Vec<_> = outcome.spawned.iter().map(|(t, _)| *t).collect();
        assert_eq!(spawned, ["a", "c"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "b");
        assert_eq!(outcome.actor_ids().len(), 2);
    }

    #[tokio::test]
    async fn injected_failure_is_reported_per_command() {
        let factory = factory(MockConfig {
            fail_blueprints: vec!["vehicle.audi.etron".into()],
            ..MockConfig::default()
        })
        .await;
        let points = factory.client().spawn_points().await.unwrap();
        let outcome = factory
            .spawn_batch(
                "operator",
                vec![((), SpawnCommand::new(Blueprint::new("vehicle.audi.etron"), points[0]))],
                true,
            )
            .await
            .unwrap();
        assert!(outcome.spawned.is_empty());
        assert_eq!(outcome.failed.len(), 1);
    }

    async fn spawn(factory: &ActorFactory<MockSimulator>, command: SpawnCommand) -> ActorId {
        let mut outcome = factory.spawn_batch("test", vec![((), command)], false).await.unwrap();
        outcome.spawned.pop().unwrap().1
    }

    #[tokio::test]
    async fn teardown_logs_failures_and_is_idempotent() {
        let factory = factory(MockConfig {
            fail_destroy: vec![1001],
            ..MockConfig::default()
        })
        .await;
        let points = factory.client().spawn_points().await.unwrap();

        let operator = spawn(&factory, SpawnCommand::new(Blueprint::new("vehicle.audi.a2"), points[0])).await;
        let camera = spawn(
            &factory,
            SpawnCommand::new(Blueprint::new("sensor.camera.rgb"), Transform::default()).attached_to(operator),
        )
        .await;
        let vehicle = spawn(&factory, SpawnCommand::new(Blueprint::new("vehicle.audi.tt"), points[1])).await;

        let mut roster = WorldRoster::new();
        roster.set_operator(operator);
        roster.register_camera("rgb".into(), CameraModality::Rgb, camera);
        roster.register_vehicle(vehicle);

        let report = factory.teardown(&mut roster).await;
        assert_eq!(report, TeardownReport { destroyed: 2, failed: 1 });
        assert!(roster.is_empty());

        let again = factory.teardown(&mut roster).await;
        assert_eq!(again, TeardownReport::default());
    }
}
