//! Sqlsweep TCP - target feed reader
//!
//! Reads `ip,port` lines, dials each target once from the configured
//! source address and parks successful sockets in a [`PendingTable`]
//! until the correlator sees the server's handshake.

pub mod dialer;
pub mod feed;
pub mod pending;

pub use dialer::Dialer;
pub use feed::{parse_line, FeedReader, FeedSummary};
pub use pending::PendingTable;
