//! Passive capture loop
//!
//! Runs on a dedicated thread for the life of the process:
//! - opens the live capture and installs the filter
//! - signals readiness exactly once through a oneshot
//! - decodes every captured frame and publishes one event per frame
//!
//! The loop never touches scan state; the channel is the only link to
//! the correlator. A full channel blocks the loop.

use sqlsweep_common::{PeerKey, ScanConfig, ScanRecord};
use sqlsweep_protocol::{decode, Handshake};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::filter::build_filter;
use crate::packet::{extract_segment, LinkLayer};
use crate::source::{PacketSource, PcapSource};

/// A decoded handshake and the peer that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    pub peer: SocketAddr,
    pub handshake: Handshake,
}

impl CaptureRecord {
    #[inline]
    #[must_use]
    pub fn key(&self) -> PeerKey {
        PeerKey::from(self.peer)
    }

    #[must_use]
    pub fn into_scan_record(self) -> ScanRecord {
        ScanRecord::from_handshake(self.peer, self.handshake)
    }
}

/// One event per captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Handshake(CaptureRecord),
    NonMatch,
}

impl CaptureEvent {
    #[inline]
    #[must_use]
    pub const fn is_sql(&self) -> bool {
        matches!(self, CaptureEvent::Handshake(_))
    }
}

/// Capture loop counters.
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub frames: AtomicU64,
    pub greetings: AtomicU64,
    pub server_errors: AtomicU64,
    pub malformed: AtomicU64,
    pub non_matches: AtomicU64,
}

/// Point-in-time copy of [`CaptureStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub frames: u64,
    pub greetings: u64,
    pub server_errors: u64,
    pub malformed: u64,
    pub non_matches: u64,
}

impl CaptureStats {
    #[must_use]
    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            greetings: self.greetings.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            non_matches: self.non_matches.load(Ordering::Relaxed),
        }
    }
}

/// Receives `Ok(())` once the filter is installed, or the setup error.
pub type Readiness = oneshot::Receiver<Result<(), CaptureError>>;

/// Start the capture worker for the families enabled in `config`.
///
/// Filter construction errors are returned directly; opening the device
/// happens on the worker and is reported through the returned [`Readiness`].
pub fn start_capture(
    config: &ScanConfig,
    events: mpsc::Sender<CaptureEvent>,
    stats: Arc<CaptureStats>,
) -> Result<Readiness, CaptureError> {
    let filter = build_filter(config)?;
    let interface = config.interface.clone();
    let (ready_tx, ready_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("capture-loop".to_string())
        .spawn(move || {
            let source = match PcapSource::open(&interface, &filter) {
                Ok(source) => source,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            info!(interface = %interface, "capture listener ready");
            if ready_tx.send(Ok(())).is_err() {
                return;
            }
            if let Err(e) = run_capture_loop(source, &events, &stats) {
                warn!(error = %e, "capture loop stopped");
            }
        })?;

    Ok(ready_rx)
}

/// Pull frames from `source` and publish one event each until the
/// receiver goes away or the source fails.
pub fn run_capture_loop<P: PacketSource>(
    mut source: P,
    events: &mpsc::Sender<CaptureEvent>,
    stats: &CaptureStats,
) -> Result<(), CaptureError> {
    let link = source.link_layer();
    loop {
        let event = match source.next_frame()? {
            Some(frame) => inspect_frame(link, frame, stats),
            None => continue,
        };
        if events.blocking_send(event).is_err() {
            debug!("event receiver dropped, stopping capture loop");
            return Ok(());
        }
    }
}

/// Classify and decode one captured frame.
///
/// Signature-matching payloads too short for their layout are counted as
/// malformed and reported as non-matches.
pub fn inspect_frame(link: LinkLayer, frame: &[u8], stats: &CaptureStats) -> CaptureEvent {
    stats.frames.fetch_add(1, Ordering::Relaxed);

    let Some(segment) = extract_segment(link, frame) else {
        stats.non_matches.fetch_add(1, Ordering::Relaxed);
        return CaptureEvent::NonMatch;
    };

    match decode(segment.payload) {
        Ok(Some(handshake)) => {
            let counter = match handshake {
                Handshake::Greeting(_) => &stats.greetings,
                Handshake::Error(_) => &stats.server_errors,
            };
            counter.fetch_add(1, Ordering::Relaxed);
            CaptureEvent::Handshake(CaptureRecord {
                peer: segment.source,
                handshake,
            })
        }
        Ok(None) => {
            stats.non_matches.fetch_add(1, Ordering::Relaxed);
            CaptureEvent::NonMatch
        }
        Err(e) => {
            stats.malformed.fetch_add(1, Ordering::Relaxed);
            debug!(peer = %segment.source, error = %e, "dropping malformed handshake");
            CaptureEvent::NonMatch
        }
    }
}
