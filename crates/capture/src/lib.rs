//! Sqlsweep Capture - passive handshake listener
//!
//! Sniffs inbound TCP payloads addressed to the scanner's own source
//! addresses and turns each captured frame into a [`CaptureEvent`]:
//! a decoded MySQL greeting or error packet, or a non-match.
//!
//! The capture runs on its own OS thread and talks to the async side
//! through a bounded tokio channel. Readiness (filter installed) is
//! reported once through a oneshot before any connection is attempted.

pub mod capture;
pub mod error;
pub mod filter;
pub mod packet;
pub mod source;

pub use capture::{
    inspect_frame, run_capture_loop, start_capture, CaptureEvent, CaptureRecord, CaptureSnapshot,
    CaptureStats, Readiness,
};
pub use error::CaptureError;
pub use filter::build_filter;
pub use packet::LinkLayer;
pub use source::{list_interfaces, PacketSource, PcapSource};
