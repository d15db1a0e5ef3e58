//! # Scenario Loader
//!
//! Scenario table loading, validation and generation.
//!
//! Responsibilities:
//! - Parse the CSV parameter table (with forward fill of blank cells)
//! - Validate every row
//! - Generate a deterministic table keyed by content hashes
//! - Select a 1-based row range for a run
//!
//! # Example
//!
//! ```no_run
//! use scenario_loader::{RowRange, ScenarioTable};
//! use std::path::Path;
//!
//! let table = ScenarioTable::load_from_path(Path::new("params.csv")).unwrap();
//! for params in table.select(RowRange::default()).unwrap() {
//!     println!("{} {} {}", params.split, params.map, params.hash);
//! }
//! ```

mod error;
mod generator;
mod parser;
mod range;
mod validator;

pub use error::{Result, ScenarioError};
pub use generator::{generate, row_hash, GeneratorConfig, DEFAULT_MASTER_SEED};
pub use parser::forward_fill;
pub use range::RowRange;

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use contracts::ScenarioParams;
use tracing::{info, instrument};

/// Loaded scenario table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioTable {
    rows: Vec<ScenarioParams>,
}

impl ScenarioTable {
    /// Build from rows, validating them
    pub fn from_rows(rows: Vec<ScenarioParams>) -> Result<Self> {
        validator::validate(&rows)?;
        Ok(Self { rows })
    }

    /// Load from a CSV file
    ///
    /// # Errors
    /// - File read failure
    /// - Parse failure (row and message)
    /// - Validation failure (row, field and message)
    #[instrument(name = "scenario_load", fields(path = %path.display()))]
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let table = Self::load_from_reader(file)?;
        info!(rows = table.len(), "scenario table loaded");
        Ok(table)
    }

    /// Load from any reader
    pub fn load_from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_rows(parser::parse(reader)?)
    }

    /// Load from a string
    pub fn load_from_str(content: &str) -> Result<Self> {
        Self::load_from_reader(content.as_bytes())
    }

    /// Generate a table
    pub fn generate(config: &GeneratorConfig) -> Result<Self> {
        Self::from_rows(generator::generate(config)?)
    }

    /// Write as CSV with a header row
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(ScenarioParams::COLUMNS)?;
        for params in &self.rows {
            csv_writer.write_record(params.cells())?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write as CSV to a file
    #[instrument(name = "scenario_write", skip(self), fields(path = %path.display(), rows = self.len()))]
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))
    }

    pub fn rows(&self) -> &[ScenarioParams] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows selected by `range`
    pub fn select(&self, range: RowRange) -> Result<&[ScenarioParams]> {
        Ok(&self.rows[range.resolve(self.rows.len())?])
    }

    /// Row counts per split, then per map
    pub fn summary(&self) -> BTreeMap<String, BTreeMap<String, usize>> {
        let mut summary: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for params in &self.rows {
            *summary
                .entry(params.split.clone())
                .or_default()
                .entry(params.map.clone())
                .or_default() += 1;
        }
        summary
    }
}
