//! Command-line argument parsing and handling.

pub mod definition;
pub mod utils;

pub use definition::{Args, process_args};
pub use utils::{apply_overrides, determine_log_level};
