//! Simulator client abstraction
//!
//! Everything the recorder needs from the simulation server, behind one
//! trait so sessions run unchanged against a real server or `MockSimulator`.

use std::future::Future;
use std::time::Duration;

use contracts::{
    ActorId, ActorState, Blueprint, CameraModality, CommandResponse, FrameId, Location, SensorId,
    SensorSource, SpawnCommand, TrafficLightState, TrafficManagerSettings, Transform, WeatherPreset,
    WorldSettings,
};

use crate::error::Result;

/// World snapshot identity returned by a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub frame: FrameId,
    /// Simulation time since the episode started (seconds)
    pub elapsed_seconds: f64,
}

/// Road state around a vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleStatus {
    /// Light affecting the vehicle, `None` when not at a light
    pub traffic_light: Option<TrafficLightState>,
    /// km/h
    pub speed_limit: f64,
}

/// Simulator client trait
pub trait SimulatorClient: Send + Sync {
    /// Connect to the server
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Maps the server can load
    fn available_maps(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Current world settings
    fn world_settings(&self) -> impl Future<Output = Result<WorldSettings>> + Send;

    /// Apply world settings, returning the frame they took effect on
    fn apply_settings(
        &self,
        settings: WorldSettings,
    ) -> impl Future<Output = Result<FrameId>> + Send;

    /// Load a map, keeping the current world settings
    ///
    /// Every actor of the previous world is gone afterwards.
    fn load_world(&self, map: &str) -> impl Future<Output = Result<()>> + Send;

    /// Advance the simulation by one step (synchronous mode)
    fn tick(&self) -> impl Future<Output = Result<Snapshot>> + Send;

    /// Blueprints matching a wildcard filter, in library order
    fn blueprints(&self, filter: &str) -> impl Future<Output = Result<Vec<Blueprint>>> + Send;

    /// Blueprint by exact id
    fn find_blueprint(&self, id: &str) -> impl Future<Output = Result<Option<Blueprint>>> + Send;

    /// Recommended vehicle spawn points of the loaded map
    fn spawn_points(&self) -> impl Future<Output = Result<Vec<Transform>>> + Send;

    /// Random point on the pedestrian navigation mesh
    fn random_navigation_location(
        &self,
    ) -> impl Future<Output = Result<Option<Location>>> + Send;

    /// Fraction of pedestrians allowed to cross roads
    fn set_pedestrians_cross_factor(&self, factor: f64)
        -> impl Future<Output = Result<()>> + Send;

    fn set_weather(&self, weather: WeatherPreset) -> impl Future<Output = Result<()>> + Send;

    /// Configure the traffic manager on `settings.port`
    fn configure_traffic_manager(
        &self,
        settings: TrafficManagerSettings,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Let the traffic manager drive the lights of these vehicles
    fn update_vehicle_lights(
        &self,
        actor_ids: &[ActorId],
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Execute a spawn batch as one request
    ///
    /// Returns exactly one response per command, in order. With `tick` the
    /// world advances one step after the batch.
    fn apply_batch_sync(
        &self,
        commands: Vec<SpawnCommand>,
        tick: bool,
    ) -> impl Future<Output = Result<Vec<CommandResponse>>> + Send;

    /// Start a walker controller towards `target` at `max_speed` (m/s)
    fn start_walker(
        &self,
        controller_id: ActorId,
        target: Location,
        max_speed: f64,
    ) -> impl Future<Output = Result<()>> + Send;

    fn stop_walker(&self, controller_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Kinematic state of an actor at the last tick
    fn actor_state(&self, actor_id: ActorId) -> impl Future<Output = Result<ActorState>> + Send;

    /// Traffic light and speed limit affecting a vehicle
    fn vehicle_status(
        &self,
        actor_id: ActorId,
    ) -> impl Future<Output = Result<VehicleStatus>> + Send;

    /// Destroy an actor
    ///
    /// Idempotent: returns Ok if the actor doesn't exist.
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Camera data source of a spawned camera
    ///
    /// Returns `None` if the actor doesn't exist or is not a camera.
    fn sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: SensorId,
        modality: CameraModality,
    ) -> Option<Box<dyn SensorSource>>;
}
