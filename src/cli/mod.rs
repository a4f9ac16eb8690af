//! CLI module for the sail tool.
//!
//! This module provides the command-line interface for creating, updating
//! and inspecting zones.

mod commands;
mod output;

pub use commands::{Cli, Commands, HelmModeArg, OutputFormat};
pub use output::OutputFormatter;
