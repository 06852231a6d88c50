//! Data output writers

use crate::Trade;

/// CSV writer for period files
pub mod csv;

/// Deterministic period file paths
pub mod path;

pub use self::csv::CsvTradeWriter;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Append-only sink for trades.
pub trait TradeWriter {
    /// Append a single trade to the sink
    fn write_trade(&mut self, trade: &Trade) -> OutputResult<()>;

    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;
}
