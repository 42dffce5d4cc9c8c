//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::report::ReportArgs;
use crate::commands::sessions::SessionsArgs;

/// Estimate how much time contributors spent on a repository.
///
/// Rebuilds work sessions from commit and comment timestamps and totals
/// them per author.
#[derive(Debug, Parser)]
#[command(name = "timespent", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarize days worked and time spent per contributor.
    Report(ReportArgs),

    /// List the reconstructed work sessions of each contributor.
    Sessions(SessionsArgs),
}
