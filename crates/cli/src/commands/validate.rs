//! `validate` command implementation.

use std::collections::HashSet;

use anyhow::{Context, Result};
use contracts::ScenarioParams;
use scenario_loader::{row_hash, ScenarioTable};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    params_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<TableSummary>,
}

#[derive(Serialize)]
struct TableSummary {
    rows: usize,
    splits: usize,
    maps: usize,
    /// Recorded frames over all rows
    frames: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(params_file = %args.params_file.display(), "Validating parameter file");

    let result = validate_table(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Parameter file validation failed")
    }
}

fn validate_table(args: &ValidateArgs) -> ValidationResult {
    let params_file = args.params_file.display().to_string();

    if !args.params_file.exists() {
        return ValidationResult {
            valid: false,
            params_file,
            error: Some(format!("File not found: {}", args.params_file.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match ScenarioTable::load_from_path(&args.params_file) {
        Ok(table) => {
            let summary = table.summary();
            ValidationResult {
                valid: true,
                params_file,
                error: None,
                warnings: collect_warnings(table.rows()),
                summary: Some(TableSummary {
                    rows: table.len(),
                    splits: summary.len(),
                    maps: summary.values().flat_map(|maps| maps.keys()).collect::<HashSet<_>>().len(),
                    frames: table.rows().iter().map(|p| u64::from(p.fps) * u64::from(p.duration)).sum(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            params_file,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Non-fatal issues: hashes name the sample directories
fn collect_warnings(rows: &[ScenarioParams]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for (i, params) in rows.iter().enumerate() {
        let row = i + 1;
        if !seen.insert(params.hash.as_str()) {
            warnings.push(format!("Row {row}: hash '{}' already used, samples will collide", params.hash));
        }
        if row_hash(params) != params.hash {
            warnings.push(format!("Row {row}: hash '{}' does not match the row content", params.hash));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Parameter file is valid: {}", result.params_file);

        if let Some(ref summary) = result.summary {
            println!("\n  Rows: {}", summary.rows);
            println!("  Splits: {}", summary.splits);
            println!("  Maps: {}", summary.maps);
            println!("  Frames: {}", summary.frames);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Parameter file is invalid: {}", result.params_file);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenario_loader::GeneratorConfig;

    #[test]
    fn generated_rows_have_no_warnings() {
        let table = ScenarioTable::generate(&GeneratorConfig::default()).unwrap();
        assert!(collect_warnings(table.rows()).is_empty());
    }

    #[test]
    fn duplicate_and_stale_hashes_are_reported() {
        let table = ScenarioTable::generate(&GeneratorConfig::default()).unwrap();
        let mut rows = table.rows()[..2].to_vec();
        rows[1].hash = rows[0].hash.clone();

        let warnings = collect_warnings(&rows);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("already used"));
        assert!(warnings[1].contains("does not match"));
    }

    #[test]
    fn missing_file_is_invalid() {
        let result = validate_table(&ValidateArgs {
            params_file: "/nonexistent/params.csv".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
