//! Initial handshake decoding
//!
//! A MySQL server speaks first: on accept it sends either a protocol-10
//! greeting or an error packet (e.g. "Host is not allowed to connect").
//! Both are recognised from the byte after the 3-byte length and the
//! sequence id, then decoded field by field with bounds checks.

use serde::Serialize;

use crate::charset::charset_name;
use crate::error::ParseError;
use crate::flags::{FlagSet, CAPABILITY_FLAGS, STATUS_FLAGS};

const SEQUENCE_OFFSET: usize = 3;
const MARKER_OFFSET: usize = 4;
const GREETING_MARKER: u8 = 0x0a;
const ERROR_MARKER: u8 = 0xff;

/// Signature of a captured payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Greeting,
    Error,
    Unrecognized,
}

/// Classify a payload by its sequence id and first body byte.
#[inline]
#[must_use]
pub fn classify(payload: &[u8]) -> PayloadKind {
    match (payload.get(SEQUENCE_OFFSET), payload.get(MARKER_OFFSET)) {
        (Some(0x00), Some(&GREETING_MARKER)) => PayloadKind::Greeting,
        (Some(0x00), Some(&ERROR_MARKER)) => PayloadKind::Error,
        _ => PayloadKind::Unrecognized,
    }
}

/// Fields of a protocol-10 server greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerGreeting {
    #[serde(rename = "Version")]
    pub protocol_version: u8,
    #[serde(rename = "VersionString")]
    pub version: String,
    #[serde(rename = "ThreadID")]
    pub thread_id: u32,
    #[serde(rename = "Salt1")]
    pub salt1: String,
    #[serde(rename = "ServerCapabilities")]
    pub capabilities: FlagSet,
    #[serde(rename = "ServerLanguage")]
    pub charset: &'static str,
    #[serde(skip)]
    pub charset_id: u8,
    #[serde(rename = "ServerStatus")]
    pub status: FlagSet,
    #[serde(rename = "Salt2")]
    pub salt2: String,
    #[serde(rename = "AuthenticationPlugin", skip_serializing_if = "Option::is_none")]
    pub auth_plugin: Option<String>,
}

/// Error packet sent in place of a greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerError {
    #[serde(rename = "Errorcode")]
    pub code: u16,
    #[serde(rename = "Errormessage")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    Greeting(ServerGreeting),
    Error(ServerError),
}

/// Classify and decode a payload.
///
/// `Ok(None)` means the payload carries neither signature. A payload that
/// matches a signature but is too short for its layout is an error.
pub fn decode(payload: &[u8]) -> Result<Option<Handshake>, ParseError> {
    match classify(payload) {
        PayloadKind::Greeting => parse_greeting(payload).map(|g| Some(Handshake::Greeting(g))),
        PayloadKind::Error => parse_error_packet(payload).map(|e| Some(Handshake::Error(e))),
        PayloadKind::Unrecognized => Ok(None),
    }
}

/// Decode a greeting payload (including its 4-byte packet header).
pub fn parse_greeting(payload: &[u8]) -> Result<ServerGreeting, ParseError> {
    let mut cursor = Cursor::at(payload, MARKER_OFFSET);

    let protocol_version = cursor.u8("protocol version")?;
    let version = text(cursor.c_str("version string")?);
    let thread_id = cursor.u32_le("thread id")?;
    let salt1 = text(cursor.take(8, "first salt")?);
    cursor.take(1, "filler")?;
    let caps_low = cursor.take(2, "capability flags")?;
    let charset_id = cursor.u8("character set")?;
    let status = cursor.take(2, "status flags")?;
    let caps_high = cursor.take(2, "extended capability flags")?;
    let plugin_len = cursor.u8("auth data length")?;
    let trailer = cursor.position();

    let (salt_end, auth_plugin) = if plugin_len == 0 {
        (payload.len(), None)
    } else {
        let width = usize::from(plugin_len) + 1;
        let start = payload
            .len()
            .checked_sub(width)
            .filter(|start| *start >= trailer)
            .ok_or(ParseError::PluginOverlap { length: width })?;
        let name = &payload[start..];
        let name = name.strip_suffix(&[0]).unwrap_or(name);
        (start, Some(text(name)))
    };

    let salt2 = &payload[trailer..salt_end];
    let padding = salt2.iter().take_while(|b| **b == 0).count();

    let capabilities = [caps_low[0], caps_low[1], caps_high[0], caps_high[1]];
    Ok(ServerGreeting {
        protocol_version,
        version,
        thread_id,
        salt1,
        capabilities: FlagSet::unpack(CAPABILITY_FLAGS, &capabilities),
        charset: charset_name(charset_id),
        charset_id,
        status: FlagSet::unpack(STATUS_FLAGS, status),
        salt2: text(&salt2[padding..]),
        auth_plugin,
    })
}

/// Decode an error payload: code at bytes 5..7, message to the end.
pub fn parse_error_packet(payload: &[u8]) -> Result<ServerError, ParseError> {
    let mut cursor = Cursor::at(payload, MARKER_OFFSET + 1);
    let code = cursor.u16_le("error code")?;
    let message = text(cursor.rest());
    Ok(ServerError { code, message })
}

#[inline]
fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Bounds-checked forward reader over a payload.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], ParseError> {
        let available = self.buf.len().saturating_sub(self.pos);
        if available < len {
            return Err(ParseError::Truncated {
                field,
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, ParseError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16_le(&mut self, field: &'static str) -> Result<u16, ParseError> {
        let b = self.take(2, field)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_le(&mut self, field: &'static str) -> Result<u32, ParseError> {
        let b = self.take(4, field)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Bytes up to the next NUL; the NUL is consumed.
    fn c_str(&mut self, field: &'static str) -> Result<&'a [u8], ParseError> {
        let rest = self.buf.get(self.pos..).unwrap_or_default();
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(ParseError::Unterminated { field, offset: self.pos })?;
        let bytes = &rest[..len];
        self.pos += len + 1;
        Ok(bytes)
    }

    fn rest(&mut self) -> &'a [u8] {
        let bytes = self.buf.get(self.pos..).unwrap_or_default();
        self.pos = self.buf.len();
        bytes
    }
}
