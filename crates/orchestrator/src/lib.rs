//! Orchestrator - scan lifecycle
//!
//! Wires the pieces together in order: start the capture worker, wait for
//! its readiness signal, dial every target, then correlate captured
//! handshakes against the pending connections until the scan drains.

mod correlator;
mod orchestrator;
mod progress;

pub use correlator::{CorrelationReport, Correlator, DrainReason};
pub use orchestrator::Orchestrator;
pub use progress::ScanSummary;
