use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("payload truncated reading {field} at offset {offset} (need {needed} bytes, have {available})")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{field} at offset {offset} is not NUL-terminated")]
    Unterminated { field: &'static str, offset: usize },

    #[error("auth plugin name of {length} bytes overlaps the fixed header")]
    PluginOverlap { length: usize },
}
