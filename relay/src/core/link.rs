//! Transport seam between a relay session and its two connections.
//!
//! A session only ever sees text frames, closes and errors. The concrete
//! WebSocket types (axum on the caller side, tokio-tungstenite on the agent
//! side) implement [`MediaLink`] so the session driver stays transport-agnostic.

use std::fmt;

use async_trait::async_trait;

use crate::errors::RelayResult;

/// Which side of the relay a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSide {
    /// The telephony media stream (caller side)
    Inbound,
    /// The conversational agent connection
    Outbound,
}

impl fmt::Display for LinkSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkSide::Inbound => write!(f, "inbound"),
            LinkSide::Outbound => write!(f, "outbound"),
        }
    }
}

/// Something observed on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A complete text frame
    Text(String),
    /// The peer closed the connection cleanly (or the stream ended)
    Closed,
    /// The transport failed
    Error(String),
}

/// A duplex, text-framed connection owned by exactly one session.
///
/// `recv` must be cancel safe: the driver polls it inside `tokio::select!`.
/// Control frames (ping, pong) and binary frames are consumed internally and
/// never surface as events.
#[async_trait]
pub trait MediaLink: Send {
    /// Wait for the next text frame, close or error.
    async fn recv(&mut self) -> LinkEvent;

    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> RelayResult<()>;

    /// Request a close. Best effort; failures are swallowed.
    async fn close(&mut self);
}

/// Opens the outbound link for a new session.
#[async_trait]
pub trait OutboundConnector: Send + Sync {
    async fn connect(&self) -> RelayResult<Box<dyn MediaLink>>;
}
