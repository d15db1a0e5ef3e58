//! # Scene Recorder CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 参数表生成、校验与查看
//! - 按参数表逐行录制样本
//! - 优雅关闭处理

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_generate, run_info, run_recorder, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Scene Recorder CLI starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_recorder(args).await,
        Commands::Generate(args) => run_generate(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
///
/// `RUST_LOG` overrides the level picked from `-v`/`-q`.
fn init_logging(cli: &Cli) -> Result<()> {
    observability::init_with_config(ObservabilityConfig::from_verbosity(
        cli.log_format.into(),
        cli.verbose,
        cli.quiet,
    ))
}
