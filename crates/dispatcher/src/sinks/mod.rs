//! Sink implementations
//!
//! Contains DatasetSink and LogSink.

mod dataset;
mod log;

pub use self::dataset::{frame_file_name, DatasetSink, ACTORS_DIR, FRAME_INFO_FILE};
pub use self::log::LogSink;
