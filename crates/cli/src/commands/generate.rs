//! `generate` command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use scenario_loader::{GeneratorConfig, ScenarioTable};
use tracing::info;

use crate::cli::GenerateArgs;

/// Execute the `generate` command
pub fn run_generate(args: &GenerateArgs) -> Result<()> {
    let path = PathBuf::from(format!("{}.csv", args.name));
    let config = GeneratorConfig::default().with_seed(args.seed);

    let table = ScenarioTable::generate(&config).context("Failed to generate scenario table")?;
    table
        .write_to_path(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), rows = table.len(), seed = args.seed, "Parameter file written");
    println!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}
