//! `run` command implementation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actor_factory::SimulatorClient;
use anyhow::{Context, Result};
use contracts::ScenarioParams;
use scene_recorder::{copy_params_file, dataset_root, sensor_timeout, CliError, Recorder, RecorderConfig};
use scenario_loader::{RowRange, ScenarioTable};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_recorder(args: &RunArgs) -> Result<()> {
    info!(params_file = %args.params_file.display(), "Loading parameter file");

    if !args.params_file.exists() {
        return Err(CliError::ParamsNotFound {
            path: args.params_file.clone(),
        }
        .into());
    }

    let table = ScenarioTable::load_from_path(&args.params_file)
        .with_context(|| format!("Failed to load {}", args.params_file.display()))?;
    let rows = table
        .select(RowRange::new(args.start_row, args.end_row))
        .context("Invalid row range")?;
    let root = dataset_root(&args.dataset_path, &args.params_file);

    info!(
        rows = rows.len(),
        total = table.len(),
        start_row = args.start_row,
        end_row = args.end_row,
        root = %root.display(),
        "Parameter file loaded"
    );

    if args.dry_run {
        info!("Dry run mode - parameter file is valid, exiting");
        print_run_summary(args, rows, &root);
        return Ok(());
    }

    copy_params_file(&args.params_file, &root)
        .with_context(|| format!("Failed to copy parameter file into {}", root.display()))?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let mut config = RecorderConfig::new(root);
    config.tm_port = args.tm_port;
    config.sensor_timeout = sensor_timeout(args.sensor_timeout)?;
    config.warmup_seconds = args.warmup_seconds;
    config.duration_override = args.duration;
    config.log_frames = args.log_frames;

    #[cfg(feature = "real-carla")]
    let client = actor_factory::RealCarlaClient::new();
    #[cfg(not(feature = "real-carla"))]
    let client = {
        warn!("built without `real-carla`, recording against the mock simulator");
        actor_factory::MockSimulator::new()
    };

    record(client, args, config, rows).await
}

async fn record<C: SimulatorClient + 'static>(
    mut client: C,
    args: &RunArgs,
    config: RecorderConfig,
    rows: &[ScenarioParams],
) -> Result<()> {
    client
        .connect(&args.host, args.port, Duration::from_secs(args.timeout))
        .await
        .map_err(|e| CliError::simulator_connection(&args.host, args.port, e.to_string()))?;

    let maps = client.available_maps().await?;
    info!(host = %args.host, port = args.port, maps = ?maps, "Connected to simulator");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping after the current tick...");
        let _ = cancel_tx.send(true);
    });

    let mut recorder = Recorder::new(Arc::new(client), config).with_cancel(cancel_rx);
    let result = recorder.run(rows).await.map(|_| ());

    let stats = recorder.stats();
    info!(
        recorded = stats.samples_recorded,
        skipped = stats.samples_skipped,
        failed = stats.samples_failed,
        frames = stats.frames_written,
        "Recording finished"
    );
    println!("{stats}");

    match result {
        Ok(()) => Ok(()),
        Err(CliError::Interrupted) => {
            warn!("Recording interrupted, unfinished sample will be overwritten on the next run");
            Ok(())
        }
        Err(e) => Err(e).context("Recording failed"),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print the rows a run would record
fn print_run_summary(args: &RunArgs, rows: &[ScenarioParams], root: &Path) {
    println!("\n=== Run Summary ===\n");
    println!("Simulator: {}:{} (tm {})", args.host, args.port, args.tm_port);
    println!("Dataset:   {}", root.display());
    if let Some(duration) = args.duration {
        println!("Duration:  {duration}s (overrides table)");
    }
    println!("Warmup:    {}s", args.warmup_seconds);
    println!("\nRows ({}):", rows.len());
    for params in rows {
        println!(
            "  - {}/{}/{} seed={} fps={} {}s vehicles={} walkers={} {}",
            params.split,
            params.map,
            params.hash,
            params.seed,
            params.fps,
            args.duration.unwrap_or(params.duration),
            params.n_vehicles,
            params.n_walkers,
            params.weather
        );
    }
    println!();
}
