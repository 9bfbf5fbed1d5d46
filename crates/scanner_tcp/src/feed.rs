//! Target feed: one `ip,port` per line
//!
//! Each accepted line ends in exactly one of two places: a pending
//! connection in the [`PendingTable`], or a connect-failure record on the
//! sink. Malformed lines and lines for a disabled family produce neither.

use anyhow::{Context, Result};
use std::net::IpAddr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, instrument, warn};

use sqlsweep_common::{
    AddressFamily, RecordSink, ScanConfig, ScanRecord, SweepError, SweepResult, Target,
};

use crate::dialer::Dialer;
use crate::pending::PendingTable;

/// Parse one input line into a dialable target.
///
/// Fields are comma separated and whitespace trimmed; anything after the
/// port is ignored.
pub fn parse_line(line: &str, config: &ScanConfig) -> SweepResult<Target> {
    let mut fields = line.split(',').map(str::trim);
    let (Some(ip), Some(port)) = (fields.next(), fields.next()) else {
        return Err(SweepError::InvalidTarget(format!("expected ip,port: {line:?}")));
    };

    let ip: IpAddr = ip
        .parse()
        .map_err(|_| SweepError::InvalidTarget(format!("bad address {ip:?}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| SweepError::InvalidTarget(format!("bad port {port:?}")))?;

    let family = AddressFamily::of(ip);
    let source = config
        .source_for(family)
        .ok_or_else(|| SweepError::InvalidTarget(format!("{family} is not enabled ({ip})")))?;

    Ok(Target::new(ip, port, source))
}

/// Counters for one pass over the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub lines: u64,
    pub rejected: u64,
    pub connect_failures: u64,
    pub connected: u64,
    pub duplicates: u64,
}

/// Sequential dialer over an input stream.
pub struct FeedReader<'a> {
    config: &'a ScanConfig,
    dialer: Dialer,
}

impl<'a> FeedReader<'a> {
    #[must_use]
    pub fn new(config: &'a ScanConfig) -> Self {
        Self {
            config,
            dialer: Dialer::from_config(config),
        }
    }

    /// Dial every target in `input`, one at a time.
    ///
    /// Connect failures go straight to `sink`; connected sockets are parked
    /// in `pending`. Undecodable lines are skipped like malformed ones; a
    /// read error ends the input early. A sink error aborts.
    #[instrument(skip_all)]
    pub async fn run<R, S>(
        &self,
        input: R,
        pending: &mut PendingTable,
        sink: &mut S,
    ) -> Result<FeedSummary>
    where
        R: AsyncBufRead + Unpin,
        S: RecordSink + ?Sized,
    {
        info!("Commencing sending");
        let mut summary = FeedSummary::default();
        let mut lines = input.split(b'\n');

        loop {
            let raw = match lines.next_segment().await {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stopped reading targets");
                    break;
                }
            };
            summary.lines += 1;

            let bytes = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
            let Ok(line) = std::str::from_utf8(bytes) else {
                debug!(len = bytes.len(), "skipping non-UTF-8 input line");
                summary.rejected += 1;
                continue;
            };

            let target = match parse_line(line, self.config) {
                Ok(target) => target,
                Err(e) => {
                    debug!(line = %line, error = %e, "skipping input line");
                    summary.rejected += 1;
                    continue;
                }
            };

            match self.dialer.dial(&target).await {
                Ok(stream) => {
                    summary.connected += 1;
                    if pending.insert(target.key(), stream) {
                        summary.duplicates += 1;
                    }
                }
                Err(e) => {
                    summary.connect_failures += 1;
                    sink.emit(ScanRecord::connect_failure(target.ip, target.port, e.to_string()))
                        .await
                        .context("writing connect failure")?;
                }
            }
        }

        debug!(?summary, pending = pending.len(), "input exhausted");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn v4_config() -> ScanConfig {
        ScanConfig::new("lo")
            .with_source_v4(Ipv4Addr::LOCALHOST)
            .with_timeout(Duration::from_secs(1))
    }

    #[test]
    fn test_parse_ipv4_line() {
        let target = parse_line("10.0.0.5,3306", &v4_config()).unwrap();
        assert_eq!(target.key().as_str(), "10.0.0.5:3306");
        assert_eq!(target.source, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_parse_trims_and_ignores_extra_fields() {
        let target = parse_line(" 10.0.0.5 , 3307 ,prod", &v4_config()).unwrap();
        assert_eq!(target.port, 3307);
    }

    #[test]
    fn test_parse_ipv6_is_bracketed() {
        let config = ScanConfig::new("lo").with_source_v6("::1".parse().unwrap());
        let target = parse_line("2001:db8::5,3306", &config).unwrap();
        assert_eq!(target.key().as_str(), "[2001:db8::5]:3306");
    }

    #[test]
    fn test_parse_mapped_address_is_ipv4() {
        let target = parse_line("::ffff:10.0.0.5,3306", &v4_config()).unwrap();
        assert_eq!(target.family, AddressFamily::V4);
        assert_eq!(target.key().as_str(), "10.0.0.5:3306");
    }

    #[test]
    fn test_parse_rejects() {
        let config = v4_config();
        for line in ["", "10.0.0.5", "host.example,3306", "10.0.0.5,http", "10.0.0.5,70000", "::1,3306"] {
            let err = parse_line(line, &config).unwrap_err();
            assert!(matches!(err, SweepError::InvalidTarget(_)), "{line:?}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_every_valid_line_lands_once() {
        let open = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = open.local_addr().unwrap().port();
        let closed_port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let input = format!(
            "127.0.0.1,{closed_port}\n127.0.0.1,{open_port}\nnot a target\n::1,3306\n"
        );
        let config = v4_config();
        let mut pending = PendingTable::new();
        let mut records: Vec<ScanRecord> = Vec::new();

        let summary = FeedReader::new(&config)
            .run(input.as_bytes(), &mut pending, &mut records)
            .await
            .unwrap();

        assert_eq!(summary.lines, 4);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.connect_failures, 1);
        assert_eq!(summary.connected, 1);

        assert_eq!(records.len(), 1);
        assert!(!records[0].is_sql());
        assert_eq!(records[0].peer().port(), closed_port);

        assert_eq!(pending.len(), 1);
        let key = sqlsweep_common::PeerKey::new(IpAddr::V4(Ipv4Addr::LOCALHOST), open_port);
        assert!(pending.contains(&key));
    }

    #[tokio::test]
    async fn test_undecodable_line_does_not_stop_input() {
        let open = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = open.local_addr().unwrap().port();
        let mut input = b"\xff\xfe,3306\r\n".to_vec();
        input.extend_from_slice(format!("127.0.0.1,{port}\r\n").as_bytes());

        let config = v4_config();
        let mut pending = PendingTable::new();
        let mut records: Vec<ScanRecord> = Vec::new();
        let summary = FeedReader::new(&config)
            .run(input.as_slice(), &mut pending, &mut records)
            .await
            .unwrap();

        assert_eq!(summary.lines, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.connected, 1);
        assert_eq!(pending.len(), 1);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_lines_keep_one_entry() {
        let open = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = open.local_addr().unwrap().port();
        let input = format!("127.0.0.1,{port}\n127.0.0.1,{port}\n");

        let config = v4_config();
        let mut pending = PendingTable::new();
        let mut records: Vec<ScanRecord> = Vec::new();
        let summary = FeedReader::new(&config)
            .run(input.as_bytes(), &mut pending, &mut records)
            .await
            .unwrap();

        assert_eq!(summary.connected, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(pending.len(), 1);
        assert!(records.is_empty());
    }
}
