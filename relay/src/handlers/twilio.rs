//! Twilio Media Streams WebSocket handler
//!
//! Each upgraded connection becomes one relay session: the caller side is the
//! upgraded socket, the agent side is opened through the state's connector.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use tracing::{Instrument, debug, info, info_span, trace};
use uuid::Uuid;

use crate::core::link::{LinkEvent, LinkSide, MediaLink};
use crate::core::session::run_session;
use crate::errors::{RelayError, RelayResult};
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Twilio WebSocket handler
///
/// Upgrades the HTTP connection and relays the media stream to the
/// conversational agent until either side goes away.
pub async fn twilio_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    debug!("Twilio WebSocket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_twilio_socket(socket, state))
}

async fn handle_twilio_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4().to_string();
    let span = info_span!("relay_session", session_id = %session_id);

    let session = run_session(
        session_id,
        TwilioLink::new(socket),
        state.connector.as_ref(),
        &state.notifier,
    )
    .instrument(span)
    .await;

    info!(
        session_id = %session.session_id(),
        call_sid = session.call_identifier().unwrap_or("-"),
        "Twilio session finished"
    );
}

/// The caller side of a session: an upgraded axum WebSocket.
pub struct TwilioLink {
    socket: WebSocket,
}

impl TwilioLink {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl MediaLink for TwilioLink {
    async fn recv(&mut self) -> LinkEvent {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => return LinkEvent::Text(text.as_str().to_owned()),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Twilio WS closed");
                    return LinkEvent::Closed;
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!("Ignoring {} byte binary frame from Twilio", data.len());
                }
                // Pings are answered by axum
                Some(Ok(_)) => trace!("Twilio control frame"),
                Some(Err(e)) => return LinkEvent::Error(e.to_string()),
                None => return LinkEvent::Closed,
            }
        }
    }

    async fn send_text(&mut self, text: String) -> RelayResult<()> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| RelayError::transport(LinkSide::Inbound, e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.send(Message::Close(None)).await {
            debug!("Twilio close frame not sent: {}", e);
        }
    }
}
