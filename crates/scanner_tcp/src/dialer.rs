//! Bounded TCP connect from a fixed source address

use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::{debug, instrument};

use sqlsweep_common::{AddressFamily, ScanConfig, SweepError, SweepResult, Target};

/// Connects to one target at a time.
///
/// The socket is bound to the target's source address before connecting,
/// so the server's reply is addressed to the host the capture filter
/// listens for.
#[derive(Debug, Clone)]
pub struct Dialer {
    timeout: Duration,
}

impl Dialer {
    #[inline]
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[inline]
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.timeout)
    }

    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connect to `target`, giving up after the configured timeout.
    #[instrument(skip_all, fields(target = %target))]
    pub async fn dial(&self, target: &Target) -> SweepResult<TcpStream> {
        let socket = match target.family {
            AddressFamily::V4 => TcpSocket::new_v4()?,
            AddressFamily::V6 => TcpSocket::new_v6()?,
        };
        socket.bind(target.bind_addr()).map_err(|e| {
            SweepError::Network(format!("bind {}: {e}", target.bind_addr()))
        })?;

        match timeout(self.timeout, socket.connect(target.socket_addr())).await {
            Ok(Ok(stream)) => {
                debug!("connected");
                Ok(stream)
            }
            Ok(Err(e)) => Err(SweepError::Network(format!("dial tcp {target}: {e}"))),
            Err(_) => Err(SweepError::Timeout(format!(
                "dial tcp {target}: no answer within {:?}",
                self.timeout
            ))),
        }
    }
}

impl Default for Dialer {
    fn default() -> Self {
        Self::new(sqlsweep_common::config::DEFAULT_TIMEOUT)
    }
}
