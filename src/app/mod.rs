//! Application shell: interactive runtime, headless modes, and wiring from settings.

/// Headless `--list` and `--install` modes.
pub mod headless;
/// Flushing of persisted state.
mod persist;
/// Event loop and background workers.
mod runtime;
/// Construction of fetcher and install collaborators.
pub mod services;
/// Terminal setup and restoration utilities.
mod terminal;

pub use runtime::run;
