//! End-of-scan summary

use std::time::Duration;
use tracing::info;

use sqlsweep_capture::CaptureSnapshot;
use sqlsweep_scanner_tcp::FeedSummary;

use crate::correlator::CorrelationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub feed: FeedSummary,
    pub correlation: CorrelationReport,
    pub capture: CaptureSnapshot,
    pub elapsed: Duration,
}

impl ScanSummary {
    /// Output records written: connect failures plus matched handshakes.
    #[inline]
    #[must_use]
    pub fn records(&self) -> u64 {
        self.feed.connect_failures + self.correlation.matched
    }

    /// Share of connected targets that answered with a handshake.
    #[must_use]
    pub fn response_rate(&self) -> Option<f64> {
        (self.feed.connected > 0)
            .then(|| self.correlation.matched as f64 / self.feed.connected as f64 * 100.0)
    }

    pub fn log(&self) {
        info!("Scan Summary:");
        info!("  Input lines: {} ({} skipped)", self.feed.lines, self.feed.rejected);
        info!("  Connect failures: {}", self.feed.connect_failures);
        info!("  Connected: {} ({} duplicates)", self.feed.connected, self.feed.duplicates);
        info!(
            "  Handshakes matched: {} (no answer: {})",
            self.correlation.matched, self.correlation.abandoned
        );
        if let Some(rate) = self.response_rate() {
            info!("  Response rate: {:.1}%", rate);
        }
        info!(
            "  Frames captured: {} (greetings {}, errors {}, malformed {}, other {})",
            self.capture.frames,
            self.capture.greetings,
            self.capture.server_errors,
            self.capture.malformed,
            self.capture.non_matches
        );
        info!("  Drained: {:?} after {:.2?}", self.correlation.reason, self.elapsed);
    }
}
