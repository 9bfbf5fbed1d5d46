//! Orchestrator - capture setup, feed, correlation

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tracing::{info, instrument};

use sqlsweep_capture::{start_capture, CaptureEvent, CaptureStats};
use sqlsweep_common::{RecordSink, ScanConfig};
use sqlsweep_scanner_tcp::{FeedReader, PendingTable};

use crate::correlator::Correlator;
use crate::progress::ScanSummary;

/// Runs one scan with a fixed configuration.
pub struct Orchestrator {
    config: ScanConfig,
    stats: Arc<CaptureStats>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            stats: Arc::new(CaptureStats::default()),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> &Arc<CaptureStats> {
        &self.stats
    }

    /// Start the capture worker, wait until its filter is installed, then
    /// scan `input`. Any setup fault returns before the first dial.
    #[instrument(skip_all, fields(interface = %self.config.interface))]
    pub async fn run<R, S>(&self, input: R, sink: &mut S) -> Result<ScanSummary>
    where
        R: AsyncBufRead + Unpin,
        S: RecordSink + ?Sized,
    {
        self.config.validate().context("invalid scan configuration")?;

        let (events_tx, mut events_rx) = mpsc::channel(self.config.channel_capacity);
        let ready = start_capture(&self.config, events_tx, Arc::clone(&self.stats))
            .context("starting capture")?;
        ready
            .await
            .context("capture worker exited during setup")?
            .with_context(|| format!("setting up capture on {}", self.config.interface))?;

        info!("Setup PCAP Listener");
        if let Some(v4) = self.config.source_v4 {
            info!("Listening on IPv4 Address {v4}");
        }
        if let Some(v6) = self.config.source_v6 {
            info!("Listening on IPv6 Address {v6}");
        }

        self.scan(input, &mut events_rx, sink).await
    }

    /// Dial every target in `input`, then correlate `events` against the
    /// connections left pending.
    pub async fn scan<R, S>(
        &self,
        input: R,
        events: &mut mpsc::Receiver<CaptureEvent>,
        sink: &mut S,
    ) -> Result<ScanSummary>
    where
        R: AsyncBufRead + Unpin,
        S: RecordSink + ?Sized,
    {
        let started = Instant::now();
        let mut pending = PendingTable::new();

        let feed = FeedReader::new(&self.config)
            .run(input, &mut pending, sink)
            .await?;
        let correlation = Correlator::new(pending, self.config.cooldown)
            .run(events, sink)
            .await?;

        let summary = ScanSummary {
            feed,
            correlation,
            capture: self.stats.snapshot(),
            elapsed: started.elapsed(),
        };
        summary.log();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::DrainReason;
    use sqlsweep_capture::CaptureRecord;
    use sqlsweep_common::ScanRecord;
    use sqlsweep_protocol::{FlagSet, Handshake, ServerGreeting, CAPABILITY_FLAGS, STATUS_FLAGS};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn greeting_event(peer: SocketAddr) -> CaptureEvent {
        CaptureEvent::Handshake(CaptureRecord {
            peer,
            handshake: Handshake::Greeting(ServerGreeting {
                protocol_version: 10,
                version: "8.0.36".into(),
                thread_id: 42,
                salt1: "abcdefgh".into(),
                capabilities: FlagSet::unpack(CAPABILITY_FLAGS, &[0xff, 0xf7, 0xff, 0x81]),
                charset: "utf8mb4_0900_ai_ci",
                charset_id: 0xff,
                status: FlagSet::unpack(STATUS_FLAGS, &[0x02, 0x00]),
                salt2: "ijklmnopqrst\0".into(),
                auth_plugin: Some("caching_sha2_password".into()),
            }),
        })
    }

    fn loopback_config() -> ScanConfig {
        ScanConfig::new("lo")
            .with_source_v4(Ipv4Addr::LOCALHOST)
            .with_timeout(Duration::from_secs(1))
            .with_cooldown(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_scan_end_to_end() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let closed_port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let (tx, mut rx) = mpsc::channel(16);
        tx.send(CaptureEvent::NonMatch).await.unwrap();
        tx.send(greeting_event(server_addr)).await.unwrap();

        let input = format!("127.0.0.1,{closed_port}\n127.0.0.1,{}\n", server_addr.port());
        let orchestrator = Orchestrator::new(loopback_config());
        let mut records: Vec<ScanRecord> = Vec::new();
        let started = Instant::now();
        let summary = orchestrator
            .scan(input.as_bytes(), &mut rx, &mut records)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(summary.correlation.reason, DrainReason::Exhausted);
        assert_eq!(summary.records(), 2);
        assert_eq!(records.len(), 2);

        let failure = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(failure["IPAddress"], "127.0.0.1");
        assert_eq!(failure["DstPort"], closed_port.to_string());
        assert_eq!(failure["Issql"], false);

        let success = serde_json::to_value(&records[1]).unwrap();
        assert_eq!(success["Issql"], true);
        assert_eq!(success["Sqlerror"], false);
        assert_eq!(success["VersionString"], "8.0.36");
        assert_eq!(success["AuthenticationPlugin"], "caching_sha2_password");
        drop(tx);
    }

    #[tokio::test]
    async fn test_handshake_for_unknown_peer_waits_for_cooldown() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let (tx, mut rx) = mpsc::channel(16);
        tx.send(greeting_event("10.0.0.5:3306".parse().unwrap())).await.unwrap();

        let config = loopback_config().with_cooldown(Duration::from_millis(50));
        let orchestrator = Orchestrator::new(config);
        let mut records: Vec<ScanRecord> = Vec::new();
        let summary = orchestrator
            .scan(format!("127.0.0.1,{port}\n").as_bytes(), &mut rx, &mut records)
            .await
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(summary.correlation.reason, DrainReason::CooldownExpired);
        assert_eq!(summary.correlation.unsolicited, 1);
        assert_eq!(summary.correlation.abandoned, 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_capture_setup_failure_aborts_before_dialing() {
        let closed_port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ScanConfig::new("sqlsweep-no-such-if0")
            .with_source_v4(Ipv4Addr::LOCALHOST)
            .with_timeout(Duration::from_secs(1));
        let orchestrator = Orchestrator::new(config);
        let mut records: Vec<ScanRecord> = Vec::new();

        let err = orchestrator
            .run(format!("127.0.0.1,{closed_port}\n").as_bytes(), &mut records)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("setting up capture on sqlsweep-no-such-if0"));
        assert!(records.is_empty());
        assert_eq!(orchestrator.stats().snapshot().frames, 0);
    }

    #[tokio::test]
    async fn test_run_rejects_config_without_family() {
        let orchestrator = Orchestrator::new(ScanConfig::new("lo"));
        let mut records: Vec<ScanRecord> = Vec::new();
        let err = orchestrator
            .run("127.0.0.1,3306\n".as_bytes(), &mut records)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("no source address"));
        assert!(records.is_empty());
    }
}
