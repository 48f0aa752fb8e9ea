use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace};

use super::config::{API_KEY_HEADER, ElevenLabsConfig};
use crate::core::link::{LinkEvent, LinkSide, MediaLink, OutboundConnector};
use crate::errors::{RelayError, RelayResult};

/// Opens one agent WebSocket per relay session.
#[derive(Debug, Clone)]
pub struct ElevenLabsConnector {
    config: ElevenLabsConfig,
}

impl ElevenLabsConnector {
    pub fn new(config: ElevenLabsConfig) -> Self {
        Self { config }
    }

}

#[async_trait]
impl OutboundConnector for ElevenLabsConnector {
    async fn connect(&self) -> RelayResult<Box<dyn MediaLink>> {
        let url = self
            .config
            .ws_url
            .as_deref()
            .ok_or_else(|| RelayError::Connect("ELEVEN_WS_URL is not configured".to_string()))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| RelayError::Connect("ELEVEN_API_KEY is not configured".to_string()))?;

        let mut request = url
            .into_client_request()
            .map_err(|e| RelayError::Connect(format!("invalid agent URL: {e}")))?;
        let mut header = HeaderValue::from_str(api_key)
            .map_err(|e| RelayError::Connect(format!("invalid API key header: {e}")))?;
        header.set_sensitive(true);
        request.headers_mut().insert(API_KEY_HEADER, header);

        let (stream, _response) =
            tokio::time::timeout(self.config.connect_timeout, connect_async(request))
                .await
                .map_err(|_| {
                    RelayError::Connect(format!(
                        "handshake timed out after {}s",
                        self.config.connect_timeout.as_secs()
                    ))
                })?
                .map_err(|e| RelayError::Connect(e.to_string()))?;

        info!("Connected to ElevenLabs");

        Ok(Box::new(ElevenLabsLink { stream }))
    }
}

/// An open agent WebSocket.
pub struct ElevenLabsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl MediaLink for ElevenLabsLink {
    async fn recv(&mut self) -> LinkEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return LinkEvent::Text(text.as_str().to_owned()),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "ElevenLabs WS closed");
                    return LinkEvent::Closed;
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!("Ignoring {} byte binary frame from agent", data.len());
                }
                // Pongs are queued by tungstenite itself
                Some(Ok(_)) => trace!("Agent control frame"),
                Some(Err(e)) => return LinkEvent::Error(e.to_string()),
                None => return LinkEvent::Closed,
            }
        }
    }

    async fn send_text(&mut self, text: String) -> RelayResult<()> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| RelayError::transport(LinkSide::Outbound, e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("ElevenLabs close handshake failed: {}", e);
        }
    }
}
