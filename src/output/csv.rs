//! CSV output writer implementation.
//!
//! One writer per period file, opened in append mode: across runs the file
//! only ever grows. The fixed header row `id,mts,datetime,amount,price` is
//! written exactly once, when the file is first created.

use crate::backfill::config::FLUSH_INTERVAL;
use crate::output::{OutputError, OutputResult, TradeWriter};
use crate::timeline::ms_to_rfc3339;
use crate::Trade;
use csv::Writer;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

const HEADER: [&str; 5] = ["id", "mts", "datetime", "amount", "price"];

/// CSV row for a single trade
#[derive(Debug, Serialize)]
struct TradeRecord {
    id: i64,
    mts: i64,
    datetime: String,
    amount: String,
    price: String,
}

impl From<&Trade> for TradeRecord {
    fn from(trade: &Trade) -> Self {
        Self {
            id: trade.id,
            mts: trade.mts,
            datetime: ms_to_rfc3339(trade.mts),
            amount: trade.amount.to_string(),
            price: trade.price.to_string(),
        }
    }
}

/// Append-mode CSV writer for one period file.
pub struct CsvTradeWriter {
    writer: Writer<BufWriter<std::fs::File>>,
    trades_written: u64,
    created: bool,
}

impl CsvTradeWriter {
    /// Open the period file for appending, creating it (and its header) if
    /// it does not exist yet.
    pub fn append<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        let existed = path.exists();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| OutputError::IoError(format!("Failed to open file: {e}")))?;

        let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(buf_writer);

        if !existed {
            writer
                .write_record(HEADER)
                .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;
            debug!("Created {} with header", path.display());
        }

        Ok(Self {
            writer,
            trades_written: 0,
            created: !existed,
        })
    }

    /// Trades appended by this writer so far.
    pub fn trades_written(&self) -> u64 {
        self.trades_written
    }

    /// Whether opening the writer created the file.
    pub fn created_file(&self) -> bool {
        self.created
    }

    /// Close the writer, flushing buffers and syncing the file to disk.
    pub fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {e}")))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

        info!("CSV writer closed: {} trades appended", self.trades_written);
        Ok(())
    }
}

impl TradeWriter for CsvTradeWriter {
    fn write_trade(&mut self, trade: &Trade) -> OutputResult<()> {
        let record = TradeRecord::from(trade);

        self.writer
            .serialize(&record)
            .map_err(|e| OutputError::CsvError(format!("Failed to write trade: {e}")))?;

        self.trades_written += 1;

        if self.trades_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
            debug!("Progress: {} trades written", self.trades_written);
        }

        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }
}
