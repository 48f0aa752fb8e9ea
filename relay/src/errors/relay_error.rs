use thiserror::Error;

use crate::core::link::LinkSide;

/// Errors that can occur while relaying a call.
///
/// Only [`RelayError::Connect`] and [`RelayError::Transport`] change the state
/// of a session. Everything else is logged and contained where it is detected;
/// malformed frames never leave the session as a `RelayError` and are reported
/// as [`CodecError`](crate::core::codec::CodecError) instead.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The outbound agent connection could not be established
    #[error("Failed to connect to conversational agent: {0}")]
    Connect(String),

    /// A transport-level failure on one side of the relay
    #[error("Transport error on {side} connection: {detail}")]
    Transport { side: LinkSide, detail: String },

    /// The transcript side-channel rejected or failed a request
    #[error("Transcript notification failed: {0}")]
    Notification(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl RelayError {
    /// Shorthand for a transport failure on the given side.
    pub fn transport(side: LinkSide, detail: impl Into<String>) -> Self {
        Self::Transport {
            side,
            detail: detail.into(),
        }
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
