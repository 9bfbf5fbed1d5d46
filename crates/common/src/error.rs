//! Error types for sqlsweep
//!
//! Shared error handling for configuration, dialing and target parsing

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for sqlsweep operations
pub type SweepResult<T> = Result<T, SweepError>;
