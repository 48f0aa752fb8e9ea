//! Relay session state machine.
//!
//! [`Session::handle`] is synchronous and performs no I/O: it consumes one
//! [`SessionEvent`] and returns the [`SessionAction`]s the driver must carry
//! out. All lifecycle rules live here so they can be tested without sockets.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::core::codec::{
    self, InboundEvent, OutboundEvent, decode_inbound, decode_outbound,
};
use crate::core::link::{LinkEvent, LinkSide};
use crate::core::notifier::{NotificationEvent, UNKNOWN_CALL_ID};

/// Lifecycle of the connection pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Outbound connect in flight
    Initializing,
    /// Both sides usable
    Active,
    /// One side went away, the other is being closed
    Closing,
    /// Nothing more will happen
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Initializing => "initializing",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// State of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The outbound handshake completed
    OutboundOpened,
    /// The outbound handshake failed
    OutboundFailed(String),
    /// Something happened on the caller side
    Inbound(LinkEvent),
    /// Something happened on the agent side
    Outbound(LinkEvent),
}

/// Work the driver must perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send an encoded frame to the agent
    ForwardToAgent(String),
    /// Send an encoded frame to the caller
    ForwardToCaller(String),
    /// Close the agent link, or abandon the connect attempt
    CloseOutbound,
    /// Close the caller link
    CloseInbound,
    /// Hand a transcript line to the notifier
    Notify(NotificationEvent),
}

/// One relay session: a caller link paired with an agent link.
#[derive(Debug)]
pub struct Session {
    session_id: String,
    state: SessionState,
    inbound: LinkState,
    outbound: LinkState,
    call_identifier: Option<String>,
}

impl Session {
    /// New session for a freshly upgraded caller connection.
    ///
    /// The outbound connect is considered started from this point on.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: SessionState::Initializing,
            inbound: LinkState::Open,
            outbound: LinkState::Connecting,
            call_identifier: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn inbound_state(&self) -> LinkState {
        self.inbound
    }

    pub fn outbound_state(&self) -> LinkState {
        self.outbound
    }

    pub fn call_identifier(&self) -> Option<&str> {
        self.call_identifier.as_deref()
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// True unless one link is open while the other is already closed.
    pub fn is_coupled(&self) -> bool {
        !matches!(
            (self.inbound, self.outbound),
            (LinkState::Open, LinkState::Closed) | (LinkState::Closed, LinkState::Open)
        )
    }

    /// Apply one event and return the resulting actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        if self.is_terminated() {
            debug!(session_id = %self.session_id, ?event, "Ignoring event after termination");
            return Vec::new();
        }

        match event {
            SessionEvent::OutboundOpened => self.on_outbound_opened(),
            SessionEvent::OutboundFailed(detail) => self.on_outbound_failed(&detail),
            SessionEvent::Inbound(LinkEvent::Text(text)) => self.on_inbound_text(&text),
            SessionEvent::Outbound(LinkEvent::Text(text)) => self.on_outbound_text(&text),
            SessionEvent::Inbound(LinkEvent::Closed) => self.on_link_down(LinkSide::Inbound, None),
            SessionEvent::Inbound(LinkEvent::Error(detail)) => {
                self.on_link_down(LinkSide::Inbound, Some(&detail))
            }
            SessionEvent::Outbound(LinkEvent::Closed) => {
                self.on_link_down(LinkSide::Outbound, None)
            }
            SessionEvent::Outbound(LinkEvent::Error(detail)) => {
                self.on_link_down(LinkSide::Outbound, Some(&detail))
            }
        }
    }

    /// The driver has issued every close request for this step.
    ///
    /// Closing is best effort, so the session does not wait for the peer to
    /// acknowledge before terminating.
    pub fn close_completed(&mut self) {
        if self.state != SessionState::Closing {
            return;
        }
        if self.inbound == LinkState::Closing {
            self.inbound = LinkState::Closed;
        }
        if self.outbound == LinkState::Closing {
            self.outbound = LinkState::Closed;
        }
        self.state = SessionState::Terminated;
        info!(session_id = %self.session_id, "Relay session terminated");
    }

    fn on_outbound_opened(&mut self) -> Vec<SessionAction> {
        match self.state {
            SessionState::Initializing => {
                info!(session_id = %self.session_id, "Connected to conversational agent");
                self.outbound = LinkState::Open;
                self.state = SessionState::Active;
                Vec::new()
            }
            _ => {
                // Caller already left while the handshake was finishing
                self.outbound = LinkState::Closing;
                vec![SessionAction::CloseOutbound]
            }
        }
    }

    fn on_outbound_failed(&mut self, detail: &str) -> Vec<SessionAction> {
        error!(session_id = %self.session_id, error = %detail, "Agent connection failed");
        self.outbound = LinkState::Closed;
        if self.state != SessionState::Initializing {
            return Vec::new();
        }
        self.state = SessionState::Closing;
        self.inbound = LinkState::Closing;
        vec![SessionAction::CloseInbound]
    }

    fn on_link_down(&mut self, side: LinkSide, detail: Option<&str>) -> Vec<SessionAction> {
        match detail {
            Some(detail) => error!(session_id = %self.session_id, %side, error = %detail, "Connection error"),
            None => info!(session_id = %self.session_id, %side, "Connection closed"),
        }

        match side {
            LinkSide::Inbound => {
                self.inbound = LinkState::Closed;
                if self.state == SessionState::Closing {
                    return Vec::new();
                }
                self.state = SessionState::Closing;
                match self.outbound {
                    LinkState::Connecting | LinkState::Open => {
                        self.outbound = LinkState::Closing;
                        vec![SessionAction::CloseOutbound]
                    }
                    LinkState::Closing | LinkState::Closed => Vec::new(),
                }
            }
            LinkSide::Outbound => {
                self.outbound = LinkState::Closed;
                if self.state == SessionState::Closing {
                    return Vec::new();
                }
                self.state = SessionState::Closing;
                match self.inbound {
                    LinkState::Connecting | LinkState::Open => {
                        self.inbound = LinkState::Closing;
                        vec![SessionAction::CloseInbound]
                    }
                    LinkState::Closing | LinkState::Closed => Vec::new(),
                }
            }
        }
    }

    fn on_inbound_text(&mut self, text: &str) -> Vec<SessionAction> {
        let event = match decode_inbound(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Error handling Twilio message");
                return Vec::new();
            }
        };

        match event {
            InboundEvent::StreamStart { call_identifier } => {
                if matches!(self.state, SessionState::Initializing | SessionState::Active) {
                    self.record_call_identifier(call_identifier);
                }
                Vec::new()
            }
            InboundEvent::MediaChunk { chunk, stream_sid } => {
                if self.state != SessionState::Active {
                    debug!(session_id = %self.session_id, state = %self.state, "Agent not ready, dropping media");
                    return Vec::new();
                }

                let frame = match codec::encode_for_outbound(&chunk.payload) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!(session_id = %self.session_id, error = %e, "Failed to encode agent frame");
                        return Vec::new();
                    }
                };

                let call_id = self
                    .call_identifier
                    .clone()
                    .or(stream_sid)
                    .unwrap_or_else(|| UNKNOWN_CALL_ID.to_string());

                vec![
                    SessionAction::ForwardToAgent(frame),
                    SessionAction::Notify(NotificationEvent::caller_chunk(call_id)),
                ]
            }
            InboundEvent::Other => Vec::new(),
        }
    }

    fn on_outbound_text(&mut self, text: &str) -> Vec<SessionAction> {
        let event = match decode_outbound(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Error handling agent message");
                return Vec::new();
            }
        };

        match event {
            OutboundEvent::AudioChunk(chunk)
                if matches!(self.state, SessionState::Active | SessionState::Closing)
                    && self.inbound == LinkState::Open =>
            {
                match codec::encode_for_inbound(&chunk.payload) {
                    Ok(frame) => vec![SessionAction::ForwardToCaller(frame)],
                    Err(e) => {
                        error!(session_id = %self.session_id, error = %e, "Failed to encode media frame");
                        Vec::new()
                    }
                }
            }
            OutboundEvent::AudioChunk(_) | OutboundEvent::Other => Vec::new(),
        }
    }

    fn record_call_identifier(&mut self, call_identifier: Option<String>) {
        match (&self.call_identifier, call_identifier) {
            (None, Some(id)) => {
                info!(session_id = %self.session_id, call_sid = %id, "Media stream started");
                self.call_identifier = Some(id);
            }
            (Some(existing), Some(id)) if *existing != id => {
                warn!(
                    session_id = %self.session_id,
                    call_sid = %existing,
                    ignored = %id,
                    "Duplicate start event, keeping first call identifier"
                );
            }
            _ => {}
        }
    }
}
