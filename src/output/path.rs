//! Deterministic period file paths.
//!
//! One physical file per calendar month, addressed by the period's start:
//! `{data_dir}/YYYY/MM/{symbol}_YYYY-MM.csv`. The layout is derived, never
//! stored, so repeated runs always resolve the same file.

use crate::output::{OutputError, OutputResult};
use crate::timeline::TimeRange;
use chrono::Datelike;
use std::path::{Path, PathBuf};

/// Resolve the period file path for `symbol` and `period`.
pub fn period_file_path(data_dir: &Path, symbol: &str, period: &TimeRange) -> PathBuf {
    let year = format!("{:04}", period.start.year());
    let month = format!("{:02}", period.start.month());
    let filename = format!("{}_{}.csv", sanitize_symbol(symbol), period.month_label());

    data_dir.join(year).join(month).join(filename)
}

/// Create the directory that will hold the period file.
pub fn ensure_period_dir(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Sanitize a symbol for filesystem safety.
///
/// Replaces directory separators and parent references so a symbol can
/// never escape the data directory. Case is preserved (symbols are
/// case-sensitive on the exchange).
pub fn sanitize_symbol(name: &str) -> String {
    name.replace("..", "__").replace(['/', '\\', ':'], "_")
}
