//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Scene Recorder - synchronized multi-camera dataset recording for CARLA
#[derive(Parser, Debug)]
#[command(
    name = "scene-recorder",
    author,
    version,
    about = "Record synchronized multi-camera driving datasets with CARLA",
    long_about = "Drives a CARLA server in synchronous mode through the rows of a scenario table.\n\n\
                  Each row spawns an operator vehicle with rgb, depth, instance segmentation \n\
                  and optical flow cameras, populates the map with traffic and pedestrians, \n\
                  and records images plus actor tables for every tick."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SCENE_RECORDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SCENE_RECORDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record the rows of a parameter file
    Run(RunArgs),

    /// Generate a parameter file
    Generate(GenerateArgs),

    /// Validate a parameter file without recording
    Validate(ValidateArgs),

    /// Display parameter file information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Scenario parameter table
    #[arg(short = 'f', long, default_value = "params.csv", env = "SCENE_RECORDER_PARAMS_FILE")]
    pub params_file: PathBuf,

    /// Dataset directory; samples go under `<dataset-path>/<params file without extension>`
    #[arg(short = 'p', long, default_value = "/mnt/dataset", env = "SCENE_RECORDER_DATASET_PATH")]
    pub dataset_path: PathBuf,

    /// First row to record (1-based)
    #[arg(short, long, default_value = "1")]
    pub start_row: usize,

    /// Last row to record, inclusive (-1 = last row)
    #[arg(short, long, default_value = "-1", allow_hyphen_values = true)]
    pub end_row: i64,

    /// Recording duration in seconds, overriding the table
    #[arg(short, long)]
    pub duration: Option<u32>,

    /// CARLA server host
    #[arg(long, default_value = "localhost", env = "CARLA_HOST")]
    pub host: String,

    /// CARLA server port
    #[arg(long, default_value = "2000", env = "CARLA_PORT")]
    pub port: u16,

    /// Traffic manager port
    #[arg(long, default_value = "8000", env = "SCENE_RECORDER_TM_PORT")]
    pub tm_port: u16,

    /// Client request timeout in seconds
    #[arg(long, default_value = "10", env = "SCENE_RECORDER_TIMEOUT")]
    pub timeout: u64,

    /// Wait for each camera frame, in seconds
    #[arg(long, default_value = "1.0", env = "SCENE_RECORDER_SENSOR_TIMEOUT")]
    pub sensor_timeout: f64,

    /// Ticks discarded at the start of each sample, in seconds
    #[arg(long, default_value = "3", env = "SCENE_RECORDER_WARMUP_SECONDS")]
    pub warmup_seconds: u32,

    /// Log a summary of every written frame
    #[arg(long)]
    pub log_frames: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SCENE_RECORDER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate the parameter file and exit without recording
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `generate` command
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Output name; writes `<name>.csv`
    pub name: String,

    /// Master seed of the generator
    #[arg(long, default_value_t = scenario_loader::DEFAULT_MASTER_SEED)]
    pub seed: u64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Parameter file to validate
    #[arg(short = 'f', long, default_value = "params.csv")]
    pub params_file: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Parameter file
    #[arg(short = 'f', long, default_value = "params.csv")]
    pub params_file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every row
    #[arg(long)]
    pub rows: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
