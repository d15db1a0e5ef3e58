//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::ScenarioParams;
use scenario_loader::ScenarioTable;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Table info for JSON output
#[derive(Serialize)]
struct TableInfo {
    params_file: String,
    rows: usize,
    /// split -> map -> row count
    splits: BTreeMap<String, BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entries: Vec<RowInfo>,
}

#[derive(Serialize)]
struct RowInfo {
    row: usize,
    hash: String,
    split: String,
    map: String,
    seed: u64,
    fps: u32,
    duration: u32,
    n_vehicles: u32,
    n_walkers: u32,
    weather: String,
}

impl RowInfo {
    fn new(row: usize, params: &ScenarioParams) -> Self {
        Self {
            row,
            hash: params.hash.clone(),
            split: params.split.clone(),
            map: params.map.clone(),
            seed: params.seed,
            fps: params.fps,
            duration: params.duration,
            n_vehicles: params.n_vehicles,
            n_walkers: params.n_walkers,
            weather: params.weather.to_string(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(params_file = %args.params_file.display(), "Loading parameter file info");

    if !args.params_file.exists() {
        anyhow::bail!("Parameter file not found: {}", args.params_file.display());
    }

    let table = ScenarioTable::load_from_path(&args.params_file)
        .with_context(|| format!("Failed to load {}", args.params_file.display()))?;
    let info = build_table_info(&table, args);

    if args.json {
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize table info")?;
        println!("{json}");
    } else {
        print_table_info(&info);
    }

    Ok(())
}

fn build_table_info(table: &ScenarioTable, args: &InfoArgs) -> TableInfo {
    let entries = if args.rows {
        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, params)| RowInfo::new(i + 1, params))
            .collect()
    } else {
        Vec::new()
    };

    TableInfo {
        params_file: args.params_file.display().to_string(),
        rows: table.len(),
        splits: table.summary(),
        entries,
    }
}

fn print_table_info(info: &TableInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Scene Recorder Parameters                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📄 {} ({} rows)", info.params_file, info.rows);

    for (split, maps) in &info.splits {
        let total: usize = maps.values().sum();
        println!("\n📁 {split} ({total})");
        for (map, count) in maps {
            println!("   {map:<16} {count:>5}");
        }
    }

    if !info.entries.is_empty() {
        println!(
            "\n{:>5}  {:<16} {:<6} {:<14} {:>6} {:>4} {:>5} {:>5} {:>5}  weather",
            "row", "hash", "split", "map", "seed", "fps", "dur", "veh", "walk"
        );
        for e in &info.entries {
            println!(
                "{:>5}  {:<16} {:<6} {:<14} {:>6} {:>4} {:>5} {:>5} {:>5}  {}",
                e.row,
                e.hash.get(..16).unwrap_or(e.hash.as_str()),
                e.split,
                e.map,
                e.seed,
                e.fps,
                e.duration,
                e.n_vehicles,
                e.n_walkers,
                e.weather
            );
        }
    }

    println!();
}
