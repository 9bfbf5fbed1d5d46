//! Core traits for sqlsweep components

use crate::record::ScanRecord;
use anyhow::Result;
use async_trait::async_trait;

/// Destination for output records.
///
/// The feed reader writes connect failures and the correlator writes matched
/// handshakes through the same sink, so output ordering follows scan order.
#[async_trait]
pub trait RecordSink: Send {
    /// Write one record.
    async fn emit(&mut self, record: ScanRecord) -> Result<()>;

    /// Flush buffered output.
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory sink, handy for collecting records.
#[async_trait]
impl RecordSink for Vec<ScanRecord> {
    async fn emit(&mut self, record: ScanRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }
}
