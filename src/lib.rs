pub mod api;
pub mod cache;
pub mod claim;
pub mod cli;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod tui;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
