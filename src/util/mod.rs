//! Utility functions and helpers.

mod logging;
mod run_id;

pub use logging::init_logging;
pub use run_id::RunId;
