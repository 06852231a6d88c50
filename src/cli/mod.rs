//! CLI command implementations

/// Backfill command and shared CLI definitions
pub mod backfill;

/// Read-only coverage reporting command
pub mod coverage;

/// CLI error types
pub mod error;

pub use backfill::{BackfillArgs, Cli, Commands};
pub use coverage::CoverageArgs;
pub use error::CliError;
