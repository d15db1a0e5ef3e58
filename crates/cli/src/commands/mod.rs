//! Command implementations.

mod generate;
mod info;
mod run;
mod validate;

pub use generate::run_generate;
pub use info::run_info;
pub use run::run_recorder;
pub use validate::run_validate;
