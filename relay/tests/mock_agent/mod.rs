//! WebSocket mock of the conversational agent
//!
//! Accepts one relay connection at a time, records the `xi-api-key` header it
//! was opened with, reports every text frame it receives, and can be told to
//! send frames or close from the test body.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// Something the agent observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentObservation {
    Connected,
    Text(String),
    Closed,
}

enum AgentCommand {
    Send(String),
    Close,
}

pub struct MockAgent {
    pub addr: SocketAddr,
    observations: mpsc::UnboundedReceiver<AgentObservation>,
    commands: mpsc::UnboundedSender<AgentCommand>,
    api_keys: Arc<Mutex<Vec<String>>>,
}

impl MockAgent {
    /// Start an agent that accepts connections carrying `expected_key`.
    pub async fn start(expected_key: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (obs_tx, observations) = mpsc::unbounded_channel();
        let (commands, mut cmd_rx) = mpsc::unbounded_channel::<AgentCommand>();
        let api_keys = Arc::new(Mutex::new(Vec::new()));

        let expected_key = expected_key.to_string();
        let seen_keys = api_keys.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let expected_key = expected_key.clone();
                let seen_keys = seen_keys.clone();
                let callback = move |request: &Request, response: Response| {
                    let key = request
                        .headers()
                        .get("xi-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    seen_keys.lock().unwrap().push(key.clone());
                    if key == expected_key {
                        Ok(response)
                    } else {
                        let mut reject = ErrorResponse::new(Some("bad api key".to_string()));
                        *reject.status_mut() = StatusCode::UNAUTHORIZED;
                        Err(reject)
                    }
                };

                let Ok(ws) = accept_hdr_async(stream, callback).await else {
                    continue;
                };
                let _ = obs_tx.send(AgentObservation::Connected);
                let (mut write, mut read) = ws.split();

                loop {
                    tokio::select! {
                        msg = read.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                let _ = obs_tx.send(AgentObservation::Text(text.as_str().to_owned()));
                            }
                            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                                let _ = obs_tx.send(AgentObservation::Closed);
                                break;
                            }
                            Some(Ok(_)) => {}
                        },
                        cmd = cmd_rx.recv() => match cmd {
                            Some(AgentCommand::Send(text)) => {
                                if write.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            Some(AgentCommand::Close) | None => {
                                let _ = write.send(Message::Close(None)).await;
                                let _ = obs_tx.send(AgentObservation::Closed);
                                break;
                            }
                        },
                    }
                }
            }
        });

        Self {
            addr,
            observations,
            commands,
            api_keys,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/v1/convai/conversation", self.addr)
    }

    /// Send a text frame to the relay.
    pub fn send(&self, text: impl Into<String>) {
        let _ = self.commands.send(AgentCommand::Send(text.into()));
    }

    /// Close the current relay connection.
    pub fn close(&self) {
        let _ = self.commands.send(AgentCommand::Close);
    }

    /// Next observation, or `None` after `wait`.
    pub async fn next(&mut self, wait: Duration) -> Option<AgentObservation> {
        timeout(wait, self.observations.recv()).await.ok().flatten()
    }

    /// Keys presented by every handshake so far.
    pub fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().unwrap().clone()
    }
}
