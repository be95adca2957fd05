//! CLI module
//!
//! Command-line interface for running the source.
//!
//! # Commands
//!
//! - `spec` - Print the configuration schema
//! - `check` - Validate config and test that every pool resolves
//! - `discover` - List pool streams
//! - `read` - Extract records from pool streams

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
