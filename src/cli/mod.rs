//! Command-line interface for the coordinator.
//!
//! Provides commands for network setup, template and session warm-up,
//! session start and cleanup, builds, and local directory merges.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
