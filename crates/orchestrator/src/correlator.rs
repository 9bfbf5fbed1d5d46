//! Correlator - matches captured handshakes to pending connections
//!
//! Runs after the feed is exhausted. Each captured handshake whose peer
//! key has a pending connection closes that connection and produces one
//! output record; everything else is dropped. The scan drains when the
//! table empties, when no event arrives within the cooldown, or when the
//! capture channel closes.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use sqlsweep_capture::CaptureEvent;
use sqlsweep_common::{RecordSink, ScanRecord};
use sqlsweep_scanner_tcp::PendingTable;

/// Why the correlator stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    /// Every pending connection was matched.
    Exhausted,
    /// No capture event arrived within the cooldown.
    CooldownExpired,
    /// The capture worker went away.
    CaptureClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationReport {
    pub reason: DrainReason,
    pub matched: u64,
    pub unsolicited: u64,
    pub non_matches: u64,
    pub abandoned: usize,
}

pub struct Correlator {
    pending: PendingTable,
    cooldown: Duration,
    matched: u64,
    unsolicited: u64,
    non_matches: u64,
}

impl Correlator {
    #[must_use]
    pub fn new(pending: PendingTable, cooldown: Duration) -> Self {
        Self {
            pending,
            cooldown,
            matched: 0,
            unsolicited: 0,
            non_matches: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Apply one capture event. Returns the record to emit, if the event
    /// matched a pending connection.
    pub fn correlate(&mut self, event: CaptureEvent) -> Option<ScanRecord> {
        let record = match event {
            CaptureEvent::Handshake(record) => record,
            CaptureEvent::NonMatch => {
                self.non_matches += 1;
                return None;
            }
        };

        let key = record.key();
        match self.pending.take(&key) {
            Some(stream) => {
                drop(stream);
                self.matched += 1;
                debug!(peer = %key, remaining = self.pending.len(), "handshake matched");
                Some(record.into_scan_record())
            }
            None => {
                self.unsolicited += 1;
                debug!(peer = %key, "handshake from a peer with no pending connection");
                None
            }
        }
    }

    /// Consume `events` until the scan drains, writing matches to `sink`.
    ///
    /// The cooldown restarts after every received event.
    #[instrument(skip_all, fields(pending = self.pending.len()))]
    pub async fn run<S>(
        mut self,
        events: &mut mpsc::Receiver<CaptureEvent>,
        sink: &mut S,
    ) -> Result<CorrelationReport>
    where
        S: RecordSink + ?Sized,
    {
        let reason = loop {
            if self.pending.is_empty() {
                break DrainReason::Exhausted;
            }
            match timeout(self.cooldown, events.recv()).await {
                Ok(Some(event)) => {
                    if let Some(record) = self.correlate(event) {
                        sink.emit(record).await.context("writing handshake record")?;
                    }
                }
                Ok(None) => break DrainReason::CaptureClosed,
                Err(_) => break DrainReason::CooldownExpired,
            }
        };

        info!(?reason, remaining = self.pending.len(), "Closing Connections");
        let abandoned = self.pending.close_all();
        sink.flush().await.context("flushing output")?;

        Ok(CorrelationReport {
            reason,
            matched: self.matched,
            unsolicited: self.unsolicited,
            non_matches: self.non_matches,
            abandoned,
        })
    }
}
