//! Library entry for tvstore exposing the catalog, transfer, install and navigation engines.

pub mod app;
pub mod args;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod install;
pub mod navigation;
pub mod net;
pub mod state;
pub mod transfer;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_utils;
