//! ElevenLabs conversational agent connection.
//!
//! The relay speaks a minimal envelope with the agent: caller audio goes out as
//! `{"audio": "<payload>"}` and agent audio comes back in the same shape.
//!
//! # Example
//!
//! ```rust,ignore
//! use bellkeeper_relay::core::elevenlabs::{ElevenLabsConfig, ElevenLabsConnector};
//! use bellkeeper_relay::core::link::OutboundConnector;
//!
//! let connector = ElevenLabsConnector::new(ElevenLabsConfig {
//!     ws_url: Some("wss://api.elevenlabs.io/v1/convai/conversation?agent_id=...".to_string()),
//!     api_key: Some(zeroize::Zeroizing::new("xi-...".to_string())),
//!     ..Default::default()
//! });
//! let mut link = connector.connect().await?;
//! ```

mod client;
mod config;

pub use client::{ElevenLabsConnector, ElevenLabsLink};
pub use config::{API_KEY_HEADER, DEFAULT_CONNECT_TIMEOUT, ElevenLabsConfig};
