//! Named bit-flag tables for the handshake's capability and status words.
//!
//! Each table lists names in wire byte order, eight per byte, most
//! significant bit first. Blank entries are reserved bits: they are never
//! reported and never re-encoded.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

pub type FlagTable = [&'static str];

/// Capability flags: low word bytes then extended word bytes.
pub const CAPABILITY_FLAGS: &FlagTable = &[
    // low word, byte 0
    "LOADDATALOCAL",
    "ODBCCLIENT",
    "CANUSECOMPRESSION",
    "DONTALLOWDATABASETABLECOLUMN",
    "CONNECTWITHDATABASE",
    "LONGCOLUMNFLAGS",
    "FOUNDROWS",
    "LONGPASSWORD",
    // low word, byte 1
    "CANDO41AUTH",
    "SPEAKS41OLD",
    "KNOWSABOUTTRANSACTIONS",
    "IGNORESIGPIPES",
    "SWITCHTOSSLAFTERHANDSHAKE",
    "INTERACTIVECLIENT",
    "SPEAKS41NEW",
    "IGNORESPACESBEFOREPARENTHESIS",
    // extended word, byte 0
    "SESSIONVARIABLETRACKING",
    "CLIENTCANHANDLEEXPIREDPASSWORDS",
    "PLUGINAUTHLENENC",
    "CONNECTATTRS",
    "PLUGINAUTH",
    "PSMULTIPLERESULTS",
    "MULTIPLERESULTS",
    "MULTIPLESTATEMENTS",
    // extended word, byte 1
    "",
    "",
    "CAPABILITYEXTENSION",
    "MULTIFACTORAUTHENTICATION",
    "QUERYATTRIBUTES",
    "ZSTDCOMPRESSIONALGORITHM",
    "CLIENTCANHANDLEOPTIONALRESULTSETMETADATA",
    "DEPRECATEEOF",
];

/// Server status flags, both bytes of the status word.
pub const STATUS_FLAGS: &FlagTable = &[
    "LASTROWSENT",
    "CURSOREXISTS",
    "NOINDEXUSED",
    "BADINDEXUSED",
    "MORERESULTS",
    "MULTIQUERY",
    "AUTOCOMMIT",
    "INTRANSACTION",
    "",
    "SESSIONSTATECHANGED",
    "INTRANSREADONLY",
    "PSOUTPARAMS",
    "QUERYWASSLOW",
    "METADATACHANGED",
    "NOBACKSLASHESCAPES",
    "DATABASEDROPPED",
];

/// A decoded flag word bound to its name table.
///
/// Bit `i` of `bits` corresponds to `table[i]`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FlagSet {
    table: &'static FlagTable,
    bits: u32,
}

impl FlagSet {
    /// Unpack raw wire bytes against `table`.
    ///
    /// Missing bytes read as zero; reserved positions are dropped.
    #[must_use]
    pub fn unpack(table: &'static FlagTable, raw: &[u8]) -> Self {
        let mut bits = 0u32;
        for (index, name) in table.iter().enumerate().take(32) {
            if name.is_empty() {
                continue;
            }
            let Some(byte) = raw.get(index / 8) else {
                break;
            };
            if byte & (0x80 >> (index % 8)) != 0 {
                bits |= 1 << index;
            }
        }
        Self { table, bits }
    }

    /// Re-encode into wire bytes, one byte per eight table entries.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut raw = vec![0u8; self.table.len().div_ceil(8)];
        for index in 0..self.table.len().min(32) {
            if self.bits & (1 << index) != 0 {
                raw[index / 8] |= 0x80 >> (index % 8);
            }
        }
        raw
    }

    /// Look up a named flag. Unknown or reserved names yield `None`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        if name.is_empty() {
            return None;
        }
        self.table
            .iter()
            .position(|candidate| *candidate == name)
            .map(|index| self.bits & (1 << index) != 0)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Every named flag with its value, lowest bit value first.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> {
        let table = self.table;
        let bits = self.bits;
        (0..table.len())
            .map(|i| (i / 8) * 8 + 7 - (i % 8))
            .filter_map(move |index| {
                let name = *table.get(index)?;
                if name.is_empty() {
                    None
                } else {
                    Some((name, bits & (1 << index) != 0))
                }
            })
    }

    /// Names of the flags that are set.
    pub fn enabled(&self) -> impl Iterator<Item = &'static str> {
        self.iter().filter(|(_, set)| *set).map(|(name, _)| name)
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.enabled()).finish()
    }
}

impl Serialize for FlagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, set) in self.iter() {
            map.serialize_entry(name, &set)?;
        }
        map.end()
    }
}
