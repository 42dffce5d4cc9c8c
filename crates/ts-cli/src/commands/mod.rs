//! CLI subcommand implementations.

pub mod input;
pub mod report;
pub mod sessions;
