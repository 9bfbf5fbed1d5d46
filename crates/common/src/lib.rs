//! Sqlsweep Common - Shared types and traits
//!
//! This crate provides the pieces every stage of the scan pipeline agrees on:
//! - `ScanConfig`, built once and passed down explicitly
//! - `Target` and the canonical `PeerKey` used for correlation
//! - output `ScanRecord`s and the `RecordSink` they are written through
//! - `SweepError`

pub mod config;
pub mod error;
pub mod record;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::ScanConfig;
pub use error::{SweepError, SweepResult};
pub use record::{ConnectFailure, GreetingRecord, ScanRecord, ServerErrorRecord};
pub use traits::RecordSink;
pub use types::{AddressFamily, PeerKey, Target};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
