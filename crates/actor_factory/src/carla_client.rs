//! Real CARLA client implementation
//!
//! Connects to a CARLA server using the carla-rust crate. Batches are
//! executed command by command inside one call, which keeps the one
//! response per command contract.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use carla::client::{
    Actor, ActorBase, ActorBlueprint, Client, Sensor, TrafficManager, Vehicle, WalkerAIController,
    World,
};
use carla::geom::{Location as CarlaLocation, Rotation as CarlaRotation, Transform as CarlaTransform};
use carla::rpc::{EpisodeSettings, TrafficLightState as CarlaLightState};
use contracts::{
    ActorId, ActorState, Blueprint, BlueprintAttribute, CameraModality, CommandResponse, FrameId,
    Location, Rotation, SensorId, SensorSource, SpawnCommand, TrafficLightState,
    TrafficManagerSettings, Transform, Vector3, WeatherPreset, WorldSettings,
};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::CarlaSensorSource;
use crate::client::{SimulatorClient, Snapshot, VehicleStatus};
use crate::error::{ActorFactoryError, Result};

const APPLY_SETTINGS_TIMEOUT: Duration = Duration::from_secs(10);

/// Real CARLA client
///
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    client: Arc<Mutex<Option<Client>>>,
    world: Arc<Mutex<Option<World>>>,
    traffic_manager: Arc<Mutex<Option<TrafficManager>>>,
    /// Spawned actors with the attributes they were spawned with
    actors: Arc<Mutex<HashMap<ActorId, (Actor, BTreeMap<String, String>)>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RealCarlaClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut guard = lock(&self.world);
        let world = guard.as_mut().ok_or_else(ActorFactoryError::not_connected)?;
        f(world)
    }

    fn with_client_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Client) -> Result<R>,
    {
        let mut guard = lock(&self.client);
        let client = guard.as_mut().ok_or_else(ActorFactoryError::not_connected)?;
        f(client)
    }

    fn actor(&self, actor_id: ActorId) -> Result<Actor> {
        lock(&self.actors)
            .get(&actor_id)
            .map(|(actor, _)| actor.clone())
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }

    fn vehicle(&self, actor_id: ActorId) -> Result<Vehicle> {
        Vehicle::try_from(self.actor(actor_id)?)
            .map_err(|_| ActorFactoryError::ActorNotFound { actor_id })
    }

    fn controller(&self, actor_id: ActorId) -> Result<WalkerAIController> {
        WalkerAIController::try_from(self.actor(actor_id)?)
            .map_err(|_| ActorFactoryError::ActorNotFound { actor_id })
    }

    fn spawn_command(&self, world: &mut World, command: &SpawnCommand) -> CommandResponse {
        let id = command.blueprint.id.as_str();
        let Some(mut bp) = world.blueprint_library().find(id) else {
            return CommandResponse::failed(format!("blueprint '{id}' not found"));
        };
        for (key, value) in command.blueprint.attribute_values() {
            if bp.contains_attribute(&key) && !bp.set_attribute(&key, &value) {
                warn!(blueprint = id, key, value, "failed to set attribute");
            }
        }

        let transform = to_carla_transform(command.transform);
        let spawned = match command.parent {
            Some(parent_id) => match self.actor(parent_id) {
                Ok(parent) => world.spawn_actor_attached(&bp, &transform, &parent, None),
                Err(e) => return CommandResponse::failed(e.to_string()),
            },
            None => world.spawn_actor(&bp, &transform),
        };

        match spawned {
            Ok(actor) => {
                let actor_id = actor.id();
                if let Some(port) = command.autopilot {
                    match Vehicle::try_from(actor.clone()) {
                        Ok(vehicle) => vehicle.set_autopilot_opt(true, port),
                        Err(_) => warn!(actor_id, "autopilot requested on a non-vehicle"),
                    }
                }
                lock(&self.actors).insert(actor_id, (actor, command.blueprint.attribute_values()));
                CommandResponse::spawned(actor_id)
            }
            Err(e) => CommandResponse::failed(e.to_string()),
        }
    }

    /// Get underlying CARLA Sensor object
    pub fn get_sensor(&self, actor_id: ActorId) -> Option<Sensor> {
        Sensor::try_from(self.actor(actor_id).ok()?).ok()
    }
}

fn to_carla_transform(transform: Transform) -> CarlaTransform {
    CarlaTransform {
        location: to_carla_location(transform.location),
        rotation: CarlaRotation {
            pitch: transform.rotation.pitch as f32,
            yaw: transform.rotation.yaw as f32,
            roll: transform.rotation.roll as f32,
        },
    }
}

fn to_carla_location(location: Location) -> CarlaLocation {
    CarlaLocation {
        x: location.x as f32,
        y: location.y as f32,
        z: location.z as f32,
    }
}

fn from_carla_transform(transform: &CarlaTransform) -> Transform {
    Transform::new(
        Location::new(
            f64::from(transform.location.x),
            f64::from(transform.location.y),
            f64::from(transform.location.z),
        ),
        Rotation::new(
            f64::from(transform.rotation.pitch),
            f64::from(transform.rotation.yaw),
            f64::from(transform.rotation.roll),
        ),
    )
}

fn to_blueprint(bp: &ActorBlueprint) -> Blueprint {
    let mut blueprint = Blueprint::new(bp.id());
    for attribute in bp.iter() {
        let mut value = BlueprintAttribute::with_recommended(attribute.recommended_values());
        value.value = attribute.value_string();
        value.modifiable = attribute.is_modifiable();
        blueprint.attributes.insert(attribute.id(), value);
    }
    blueprint
}

fn to_episode_settings(base: EpisodeSettings, settings: WorldSettings) -> EpisodeSettings {
    EpisodeSettings {
        synchronous_mode: settings.synchronous_mode,
        fixed_delta_seconds: settings.fixed_delta_seconds,
        deterministic_ragdolls: settings.deterministic_ragdolls,
        max_substep_delta_time: settings.max_substep_delta_time,
        max_substeps: settings.max_substeps as u64,
        ..base
    }
}

fn light_state(state: CarlaLightState) -> TrafficLightState {
    match state {
        CarlaLightState::Red => TrafficLightState::Red,
        CarlaLightState::Yellow => TrafficLightState::Yellow,
        CarlaLightState::Green => TrafficLightState::Green,
        CarlaLightState::Off => TrafficLightState::Off,
        _ => TrafficLightState::Unknown,
    }
}

/// (cloudiness, precipitation, deposits, wind, wetness, sun altitude)
fn weather_values(preset: WeatherPreset) -> (f32, f32, f32, f32, f32, f32) {
    let noon = !preset.is_sunset();
    let sun = if noon { 45.0 } else { 15.0 };
    match preset {
        WeatherPreset::Default => (-1.0, -1.0, -1.0, -1.0, -1.0, -1.0),
        WeatherPreset::ClearNoon | WeatherPreset::ClearSunset => (5.0, 0.0, 0.0, 10.0, 0.0, sun),
        WeatherPreset::CloudyNoon | WeatherPreset::CloudySunset => (60.0, 0.0, 0.0, 10.0, 0.0, sun),
        WeatherPreset::WetNoon | WeatherPreset::WetSunset => (5.0, 0.0, 50.0, 10.0, 0.0, sun),
        WeatherPreset::WetCloudyNoon | WeatherPreset::WetCloudySunset => (60.0, 0.0, 50.0, 10.0, 0.0, sun),
        WeatherPreset::SoftRainNoon | WeatherPreset::SoftRainSunset => (20.0, 30.0, 50.0, 30.0, 0.0, sun),
        WeatherPreset::MidRainyNoon | WeatherPreset::MidRainSunset => (60.0, 60.0, 60.0, 60.0, 0.0, sun),
        WeatherPreset::HardRainNoon | WeatherPreset::HardRainSunset => (100.0, 100.0, 90.0, 100.0, 0.0, sun),
    }
}

impl SimulatorClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self, timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let mut client = Client::connect(host, port, None);
        client.set_timeout(timeout);
        let world = client.world();

        info!(map = %world.map().name(), "connected to CARLA server");

        *lock(&self.client) = Some(client);
        *lock(&self.world) = Some(world);
        Ok(())
    }

    async fn available_maps(&self) -> Result<Vec<String>> {
        self.with_client_mut(|client| Ok(client.available_maps()))
    }

    async fn world_settings(&self) -> Result<WorldSettings> {
        self.with_world_mut(|world| {
            let s = world.settings();
            Ok(WorldSettings {
                synchronous_mode: s.synchronous_mode,
                fixed_delta_seconds: s.fixed_delta_seconds,
                deterministic_ragdolls: s.deterministic_ragdolls,
                max_substep_delta_time: s.max_substep_delta_time,
                max_substeps: s.max_substeps as u32,
            })
        })
    }

    #[instrument(name = "real_carla_apply_settings", skip(self, settings), fields(sync = settings.synchronous_mode))]
    async fn apply_settings(&self, settings: WorldSettings) -> Result<FrameId> {
        self.with_world_mut(|world| {
            let episode = to_episode_settings(world.settings(), settings);
            Ok(world.apply_settings(&episode, APPLY_SETTINGS_TIMEOUT))
        })
    }

    #[instrument(name = "real_carla_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<()> {
        let world = self.with_client_mut(|client| {
            if !client.available_maps().iter().any(|m| m.ends_with(map)) {
                return Err(ActorFactoryError::UnknownMap {
                    map: map.to_string(),
                });
            }
            Ok(client.load_world_opt(map, false, carla::rpc::MapLayer::All))
        })?;
        lock(&self.actors).clear();
        *lock(&self.world) = Some(world);
        Ok(())
    }

    async fn tick(&self) -> Result<Snapshot> {
        self.with_world_mut(|world| {
            let frame = world.tick();
            let elapsed_seconds = world.snapshot().timestamp().elapsed_seconds;
            Ok(Snapshot {
                frame,
                elapsed_seconds,
            })
        })
    }

    async fn blueprints(&self, filter: &str) -> Result<Vec<Blueprint>> {
        self.with_world_mut(|world| {
            Ok(world
                .blueprint_library()
                .filter(filter)
                .iter()
                .map(|bp| to_blueprint(&bp))
                .collect())
        })
    }

    async fn find_blueprint(&self, id: &str) -> Result<Option<Blueprint>> {
        self.with_world_mut(|world| Ok(world.blueprint_library().find(id).map(|bp| to_blueprint(&bp))))
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.with_world_mut(|world| {
            Ok(world
                .map()
                .recommended_spawn_points()
                .iter()
                .map(|t| from_carla_transform(&t))
                .collect())
        })
    }

    async fn random_navigation_location(&self) -> Result<Option<Location>> {
        self.with_world_mut(|world| {
            let loc = world.random_location_from_navigation();
            Ok(Some(Location::new(
                f64::from(loc.x),
                f64::from(loc.y),
                f64::from(loc.z),
            )))
        })
    }

    async fn set_pedestrians_cross_factor(&self, factor: f64) -> Result<()> {
        self.with_world_mut(|world| {
            world.set_pedestrians_cross_factor(factor as f32);
            Ok(())
        })
    }

    async fn set_weather(&self, weather: WeatherPreset) -> Result<()> {
        self.with_world_mut(|world| {
            if weather == WeatherPreset::Default {
                return Ok(());
            }
            let (cloudiness, precipitation, deposits, wind, wetness, sun) = weather_values(weather);
            let mut params = world.weather();
            params.cloudiness = cloudiness;
            params.precipitation = precipitation;
            params.precipitation_deposits = deposits;
            params.wind_intensity = wind;
            params.wetness = wetness;
            params.sun_altitude_angle = sun;
            world.set_weather(&params);
            Ok(())
        })
    }

    #[instrument(name = "real_carla_configure_tm", skip(self, settings), fields(port = settings.port))]
    async fn configure_traffic_manager(&self, settings: TrafficManagerSettings) -> Result<()> {
        let mut tm = self.with_client_mut(|client| Ok(client.instance_tm(settings.port)))?;
        tm.set_global_distance_to_leading_vehicle(settings.distance_to_leading_vehicle as f32);
        tm.set_global_percentage_speed_difference(settings.speed_difference_percent as f32);
        tm.set_random_device_seed(settings.seed);
        tm.set_synchronous_mode(settings.synchronous_mode);
        *lock(&self.traffic_manager) = Some(tm);
        Ok(())
    }

    async fn update_vehicle_lights(&self, actor_ids: &[ActorId], enabled: bool) -> Result<()> {
        let mut guard = lock(&self.traffic_manager);
        let tm = guard
            .as_mut()
            .ok_or_else(|| ActorFactoryError::simulator("traffic manager not configured"))?;
        for &actor_id in actor_ids {
            let actor = self.actor(actor_id)?;
            tm.update_vehicle_lights(&actor, enabled);
        }
        Ok(())
    }

    #[instrument(name = "real_carla_apply_batch", skip(self, commands), fields(commands = commands.len(), tick))]
    async fn apply_batch_sync(&self, commands: Vec<SpawnCommand>, tick: bool) -> Result<Vec<CommandResponse>> {
        self.with_world_mut(|world| {
            let responses = commands
                .iter()
                .map(|command| self.spawn_command(world, command))
                .collect();
            if tick {
                world.tick();
            }
            Ok(responses)
        })
    }

    async fn start_walker(&self, controller_id: ActorId, target: Location, max_speed: f64) -> Result<()> {
        let controller = self.controller(controller_id)?;
        controller.start();
        controller.go_to_location(&to_carla_location(target));
        controller.set_max_speed(max_speed as f32);
        Ok(())
    }

    async fn stop_walker(&self, controller_id: ActorId) -> Result<()> {
        if let Ok(controller) = self.controller(controller_id) {
            controller.stop();
        }
        Ok(())
    }

    async fn actor_state(&self, actor_id: ActorId) -> Result<ActorState> {
        let (actor, attributes) = lock(&self.actors)
            .get(&actor_id)
            .cloned()
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })?;

        let v = actor.velocity();
        let a = actor.acceleration();
        let w = actor.angular_velocity();
        Ok(ActorState {
            id: actor_id,
            type_id: actor.type_id(),
            attributes,
            transform: from_carla_transform(&actor.transform()),
            velocity: Vector3::new(f64::from(v.x), f64::from(v.y), f64::from(v.z)),
            acceleration: Vector3::new(f64::from(a.x), f64::from(a.y), f64::from(a.z)),
            angular_velocity: Vector3::new(f64::from(w.x), f64::from(w.y), f64::from(w.z)),
        })
    }

    async fn vehicle_status(&self, actor_id: ActorId) -> Result<VehicleStatus> {
        let vehicle = self.vehicle(actor_id)?;
        let traffic_light = vehicle
            .is_at_traffic_light()
            .then(|| light_state(vehicle.traffic_light_state()));
        Ok(VehicleStatus {
            traffic_light,
            speed_limit: f64::from(vehicle.speed_limit()),
        })
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let removed = lock(&self.actors).remove(&actor_id);

        if let Some((actor, _)) = removed {
            if let Ok(sensor) = Sensor::try_from(actor.clone()) {
                if sensor.is_listening() {
                    sensor.stop();
                }
            }
            if !actor.destroy() {
                warn!(actor_id, "destroy returned false");
            }
            debug!(actor_id, "actor destroyed");
        }

        // Idempotent: return Ok even if not exists
        Ok(())
    }

    fn sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: SensorId,
        modality: CameraModality,
    ) -> Option<Box<dyn SensorSource>> {
        let sensor = self.get_sensor(actor_id)?;
        Some(Box::new(CarlaSensorSource::new(sensor_id, modality, sensor)))
    }
}

#[cfg(test)]
mod tests {
    // Real client tests require a CARLA server; run with `--ignored`
    use super::*;

    #[tokio::test]
    #[ignore = "requires CARLA server"]
    async fn test_real_client_connect() {
        let mut client = RealCarlaClient::new();
        client
            .connect("localhost", 2000, Duration::from_secs(10))
            .await
            .unwrap();
        assert!(!client.available_maps().await.unwrap().is_empty());
    }
}
