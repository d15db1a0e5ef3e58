//! DataSink trait - Dispatcher output interface
//!
//! Every sample writer implements this trait.

use crate::{ContractError, FrameSample};

/// Frame sample consumer
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one accepted tick
    ///
    /// # Errors
    /// Returns a write error naming what failed
    async fn write(&mut self, sample: &FrameSample) -> Result<(), ContractError>;

    /// Flush buffered output
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink, writing any aggregated tables
    async fn close(&mut self) -> Result<(), ContractError>;
}
