//! Output records, one JSON object per line
//!
//! Three shapes share the `IPAddress`/`DstPort`/`Issql` prefix:
//! a failed connect, a decoded greeting, and a server error packet.

use serde::{Serialize, Serializer};
use std::net::{IpAddr, SocketAddr};

use sqlsweep_protocol::{Handshake, ServerError, ServerGreeting};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScanRecord {
    ConnectFailure(ConnectFailure),
    Greeting(GreetingRecord),
    ServerError(ServerErrorRecord),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectFailure {
    #[serde(rename = "IPAddress")]
    pub ip: IpAddr,
    #[serde(rename = "DstPort", serialize_with = "port_string")]
    pub port: u16,
    #[serde(rename = "Issql")]
    pub is_sql: bool,
    #[serde(rename = "Errormessage")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GreetingRecord {
    #[serde(rename = "IPAddress")]
    pub ip: IpAddr,
    #[serde(rename = "DstPort", serialize_with = "port_string")]
    pub port: u16,
    #[serde(rename = "Issql")]
    pub is_sql: bool,
    #[serde(rename = "Sqlerror")]
    pub is_error: bool,
    #[serde(flatten)]
    pub greeting: ServerGreeting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerErrorRecord {
    #[serde(rename = "IPAddress")]
    pub ip: IpAddr,
    #[serde(rename = "DstPort", serialize_with = "port_string")]
    pub port: u16,
    #[serde(rename = "Issql")]
    pub is_sql: bool,
    #[serde(rename = "Sqlerror")]
    pub is_error: bool,
    #[serde(flatten)]
    pub error: ServerError,
}

impl ScanRecord {
    /// A target that could not be connected to.
    #[must_use]
    pub fn connect_failure<S: Into<String>>(ip: IpAddr, port: u16, message: S) -> Self {
        ScanRecord::ConnectFailure(ConnectFailure {
            ip,
            port,
            is_sql: false,
            message: message.into(),
        })
    }

    /// A decoded handshake observed from `peer`.
    #[must_use]
    pub fn from_handshake(peer: SocketAddr, handshake: Handshake) -> Self {
        let ip = peer.ip().to_canonical();
        let port = peer.port();
        match handshake {
            Handshake::Greeting(greeting) => ScanRecord::Greeting(GreetingRecord {
                ip,
                port,
                is_sql: true,
                is_error: false,
                greeting,
            }),
            Handshake::Error(error) => ScanRecord::ServerError(ServerErrorRecord {
                ip,
                port,
                is_sql: true,
                is_error: true,
                error,
            }),
        }
    }

    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        match self {
            ScanRecord::ConnectFailure(r) => SocketAddr::new(r.ip, r.port),
            ScanRecord::Greeting(r) => SocketAddr::new(r.ip, r.port),
            ScanRecord::ServerError(r) => SocketAddr::new(r.ip, r.port),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_sql(&self) -> bool {
        !matches!(self, ScanRecord::ConnectFailure(_))
    }

    /// Render as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn port_string<S: Serializer>(port: &u16, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(port)
}
