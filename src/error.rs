//! Error types for the chat server
//!
//! Defines application-level errors, name rejections, configuration
//! errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Application-level errors
///
/// Everything here is contained within one session's lifecycle; the
/// registry never propagates one session's error to another.
#[derive(Debug, Error)]
pub enum AppError {
    /// Transport read/write error (fatal to the session)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error, e.g. an over-long line (fatal to the session)
    #[error("Line codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Channel send error (fatal - registry actor or writer task gone)
    #[error("Channel send error")]
    ChannelSend,

    /// Every registry slot is occupied
    #[error("Registry full ({capacity} sessions)")]
    CapacityExceeded { capacity: usize },

    /// A proposed name was refused (recoverable, the prompt is repeated)
    #[error("Name rejected: {0}")]
    NameRejected(#[from] NameRejection),

    /// No acceptable name within the try budget
    #[error("Name negotiation failed after {tries} tries")]
    NameNegotiationExhausted { tries: usize },

    /// Private message target is not registered
    #[error("No session named {0}")]
    UnresolvedTarget(String),
}

/// Reasons a proposed display name is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameRejection {
    /// Name contains the reserved sentinel character
    #[error("name contains the reserved character")]
    ContainsSentinel,

    /// Another session already holds this name
    #[error("name '{0}' is already used")]
    AlreadyTaken(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Message send errors
///
/// Occurs when a line cannot be queued for a session's writer.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
