//! JSON-lines output

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use sqlsweep_common::{RecordSink, ScanRecord};

/// Writes each record as one JSON object followed by a newline.
///
/// Every record is flushed as soon as it is written so output streams
/// while the scan is still dialing.
pub struct JsonLineSink<W> {
    writer: BufWriter<W>,
    written: u64,
}

impl<W: AsyncWrite + Unpin + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> RecordSink for JsonLineSink<W> {
    async fn emit(&mut self, record: ScanRecord) -> Result<()> {
        let mut line = record.to_json_line().context("serializing record")?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use sqlsweep_protocol::{Handshake, ServerError};

    #[tokio::test]
    async fn test_one_object_per_line() {
        let mut sink = JsonLineSink::new(Vec::new());
        sink.emit(ScanRecord::connect_failure(
            "2001:db8::1".parse().unwrap(),
            3306,
            "connection refused",
        ))
        .await
        .unwrap();
        sink.emit(ScanRecord::from_handshake(
            "10.0.0.5:3306".parse().unwrap(),
            Handshake::Error(ServerError {
                code: 1129,
                message: "Host '10.0.0.2' is blocked".into(),
            }),
        ))
        .await
        .unwrap();
        sink.flush().await.unwrap();
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(output.ends_with('\n'));

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["IPAddress"], "2001:db8::1");
        assert_eq!(first["Issql"], false);

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["Errorcode"], 1129);
        assert_eq!(second["Sqlerror"], true);
    }
}
