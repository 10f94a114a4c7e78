//! Error types for the rbnbot-feed crate.

use thiserror::Error;

/// Errors from supervising the spot feed process or decoding its output.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed binary could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The child started but its stdout pipe was not available.
    #[error("feed process has no stdout pipe")]
    NoStdout,

    /// The feed executable could not be located.
    #[error("feed executable not found: {0}")]
    NotFound(String),
}

/// Why a single feed line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected 4 '_'-separated fields, got {0}")]
    FieldCount(usize),

    #[error("empty {0} field")]
    EmptyField(&'static str),

    #[error("frequency is not a number: {0:?}")]
    Frequency(String),

    #[error("rate is not a number: {0:?}")]
    Rate(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, FeedError>;
