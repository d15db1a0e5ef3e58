//! Recorder - drives the simulator through the rows of a scenario table
//!
//! For every row: prepare the sample directory, switch the server to
//! synchronous stepping at the row's fps, run a world session, hand the
//! accepted ticks to the dispatcher and finish `sample_info.yml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actor_factory::SimulatorClient;
use contracts::{ScenarioParams, WorldSettings};
use dispatcher::sample_info::{self, SampleInfo};
use dispatcher::{Dispatcher, DispatcherConfig};
use observability::{record_sample_finished, RunStats, SampleOutcome};
use session::{SessionConfig, SyncWorld, DEFAULT_TM_PORT};
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::error::{CliError, Result};

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Dataset root of this parameter file
    pub dataset_root: PathBuf,
    pub tm_port: u16,
    /// Wait for each camera per tick
    pub sensor_timeout: Duration,
    /// Ticks discarded at the start of each sample, in seconds
    pub warmup_seconds: u32,
    /// Recording duration overriding the table's
    pub duration_override: Option<u32>,
    /// Log a summary of every written frame
    pub log_frames: bool,
}

impl RecorderConfig {
    pub fn new(dataset_root: impl Into<PathBuf>) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            tm_port: DEFAULT_TM_PORT,
            sensor_timeout: Duration::from_secs(1),
            warmup_seconds: 3,
            duration_override: None,
            log_frames: false,
        }
    }
}

/// Camera wait from `--sensor-timeout` seconds
///
/// # Errors
/// `InvalidArgument` unless the value is finite and positive.
pub fn sensor_timeout(seconds: f64) -> Result<Duration> {
    let invalid = |message: String| CliError::InvalidArgument {
        name: "sensor-timeout",
        message,
    };
    if !(seconds > 0.0) {
        return Err(invalid(format!("{seconds} is not a positive number of seconds")));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| invalid(e.to_string()))
}

/// `<dataset-path>/<params file path without its extension>`
pub fn dataset_root(dataset_path: &Path, params_file: &Path) -> PathBuf {
    dataset_path.join(params_file.with_extension(""))
}

/// `<root>/<split>/<map>/<hash>`
pub fn sample_dir(root: &Path, params: &ScenarioParams) -> PathBuf {
    root.join(&params.split).join(&params.map).join(&params.hash)
}

/// Copy the parameter file into the dataset root
pub fn copy_params_file(params_file: &Path, root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(root)?;
    let target = root.join("params.csv");
    fs::copy(params_file, &target)?;
    Ok(target)
}

/// Scenario table driver
pub struct Recorder<C: SimulatorClient + 'static> {
    client: Arc<C>,
    config: RecorderConfig,
    stats: RunStats,
    cancel: watch::Receiver<bool>,
}

impl<C: SimulatorClient + 'static> Recorder<C> {
    pub fn new(client: Arc<C>, config: RecorderConfig) -> Self {
        // Never cancelled unless `with_cancel` is used
        let (_, cancel) = watch::channel(false);
        Self {
            client,
            config,
            stats: RunStats::new(),
            cancel,
        }
    }

    /// Stop after the current tick once `cancel` turns true
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    fn cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Record every row, restoring the original world settings at the end
    ///
    /// A failed sample is logged and the next row is recorded.
    ///
    /// # Errors
    /// Settings could not be read or restored, or the run was interrupted.
    #[instrument(name = "recorder_run", skip(self, rows), fields(rows = rows.len(), root = %self.config.dataset_root.display()))]
    pub async fn run(&mut self, rows: &[ScenarioParams]) -> Result<&RunStats> {
        let original = self.client.world_settings().await?;
        let outcome = self.run_rows(rows).await;

        if let Err(e) = self.client.apply_settings(original).await {
            error!(error = %e, "failed to restore original world settings");
        } else {
            info!("original world settings restored");
        }

        outcome.map(|()| &self.stats)
    }

    async fn run_rows(&mut self, rows: &[ScenarioParams]) -> Result<()> {
        for (i, params) in rows.iter().enumerate() {
            if self.cancelled() {
                return Err(CliError::Interrupted);
            }
            info!(
                row = i + 1,
                total = rows.len(),
                split = %params.split,
                map = %params.map,
                hash = %params.hash,
                seed = params.seed,
                fps = params.fps,
                vehicles = params.n_vehicles,
                walkers = params.n_walkers,
                weather = %params.weather,
                "Load world"
            );

            let started = Instant::now();
            let outcome = match self.record_sample(params).await {
                Ok(outcome) => outcome,
                Err(CliError::Interrupted) => {
                    self.finish_sample(SampleOutcome::Failed, started);
                    return Err(CliError::Interrupted);
                }
                Err(e) => {
                    error!(hash = %params.hash, error = %e, "sample failed, continuing with next row");
                    SampleOutcome::Failed
                }
            };
            self.finish_sample(outcome, started);
        }
        Ok(())
    }

    fn finish_sample(&mut self, outcome: SampleOutcome, started: Instant) {
        let elapsed = started.elapsed().as_secs_f64();
        record_sample_finished(outcome);
        self.stats.record_sample(outcome, elapsed);
        if outcome == SampleOutcome::Recorded {
            info!(seconds = elapsed, "Time to process");
        }
    }

    /// Record one row into its sample directory
    #[instrument(name = "recorder_sample", skip(self, params), fields(hash = %params.hash))]
    pub async fn record_sample(&mut self, params: &ScenarioParams) -> Result<SampleOutcome> {
        let started = Instant::now();
        let dir = sample_dir(&self.config.dataset_root, params);

        if sample_info::is_finished(&dir) {
            info!(dir = %dir.display(), "sample already exists, skipping");
            return Ok(SampleOutcome::Skipped);
        }
        if dir.exists() {
            warn!(dir = %dir.display(), "sample_info.yml missing or incomplete, overwriting sample");
            fs::remove_dir_all(&dir)?;
        }

        let duration = self.config.duration_override.unwrap_or(params.duration);
        let fps = u64::from(params.fps);
        let warmup_ticks = u64::from(self.config.warmup_seconds) * fps;
        let frames = u64::from(duration) * fps;

        self.client.apply_settings(WorldSettings::synchronous(params.fps)).await?;

        let session_config =
            SessionConfig::from_params(params, self.config.tm_port).with_warmup_seconds(self.config.warmup_seconds);
        let mut dispatcher =
            Dispatcher::for_sample(&DispatcherConfig::new(&dir).with_log_frames(self.config.log_frames))?;

        let timeout = self.config.sensor_timeout;
        let cancel = &self.cancel;
        let stats = &mut self.stats;
        let sink = &mut dispatcher;
        let session = SyncWorld::scope(self.client.clone(), session_config, async |world| {
            let info = SampleInfo::new(
                params,
                duration,
                world.operator().unwrap_or_default(),
                world.roster().vehicles.len(),
                world.roster().walkers.len(),
            );
            sample_info::write(&dir, &info, false)?;

            for _ in 0..warmup_ticks + frames {
                if *cancel.borrow() {
                    return Err(CliError::Interrupted);
                }
                let sample = world.tick(timeout).await?;
                stats.record_tick(&world.last_stats());
                if world.in_warmup() {
                    continue;
                }
                sink.dispatch(sample).await?;
            }
            Ok::<_, CliError>(())
        })
        .await;

        // Written frames are flushed and frame_info.csv closed even after a failure
        let report = dispatcher.shutdown().await;
        self.stats.record_frames_written(report.frames_written());

        let ((), summary) = session?;
        if !report.dataset_complete() || report.frames_written() != frames {
            return Err(CliError::IncompleteSample {
                hash: params.hash.clone(),
                written: report.frames_written(),
                expected: frames,
            });
        }

        sample_info::finish(&dir, started.elapsed().as_secs_f64())?;
        info!(
            frames = summary.frame_meta.len(),
            vehicles = summary.vehicles,
            walkers = summary.walkers,
            destroyed = summary.teardown.destroyed,
            "sample recorded"
        );
        Ok(SampleOutcome::Recorded)
    }
}
