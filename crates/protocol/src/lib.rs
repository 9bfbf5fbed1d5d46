//! Sqlsweep Protocol - MySQL handshake decoding
//!
//! Pure byte-level decoding of the packet a MySQL server sends right after
//! accepting a TCP connection:
//! - signature classification (greeting vs. error vs. anything else)
//! - protocol-10 greeting fields, including named capability/status flags
//! - error packet code and message
//!
//! No networking lives here; callers hand in an application payload.

pub mod charset;
pub mod error;
pub mod flags;
pub mod handshake;

pub use charset::charset_name;
pub use error::ParseError;
pub use flags::{FlagSet, FlagTable, CAPABILITY_FLAGS, STATUS_FLAGS};
pub use handshake::{
    classify, decode, parse_error_packet, parse_greeting, Handshake, PayloadKind, ServerError,
    ServerGreeting,
};
