//! Wire message types for both sides of the relay.
//!
//! Inbound frames follow the Twilio Media Streams protocol. Outbound frames use
//! the agent's minimal `{"audio": ...}` envelope.

use serde::{Deserialize, Serialize};

// =============================================================================
// Inbound (Twilio -> relay)
// =============================================================================

/// Frames sent by the telephony media stream.
///
/// Only `start` and `media` carry meaning for the relay; `connected`, `stop`,
/// `mark`, `dtmf` and anything newer fall through to `Unrecognized`.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioMessage {
    /// Stream metadata, sent once before any media
    Start {
        #[serde(default)]
        start: Option<StartMetadata>,
        #[serde(default, rename = "streamSid")]
        stream_sid: Option<String>,
    },

    /// One chunk of caller audio
    Media {
        #[serde(default)]
        media: Option<MediaPayload>,
        #[serde(default, rename = "streamSid")]
        stream_sid: Option<String>,
    },

    #[serde(other)]
    Unrecognized,
}

/// Body of the `start` frame.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub stream_sid: Option<String>,
}

/// Body of the `media` frame.
#[derive(Debug, Default, Deserialize)]
pub struct MediaPayload {
    /// Base64 audio, treated as opaque
    #[serde(default)]
    pub payload: Option<String>,
}

// =============================================================================
// Outbound (agent -> relay)
// =============================================================================

/// Frames sent by the conversational agent. Extra fields are ignored.
#[derive(Debug, Deserialize)]
pub struct AgentFrame {
    #[serde(default)]
    pub audio: Option<String>,
}

// =============================================================================
// Encoded envelopes
// =============================================================================

/// Envelope expected by the agent.
#[derive(Debug, Serialize)]
pub struct AgentAudio<'a> {
    pub audio: &'a str,
}

/// Media frame expected by the telephony stream.
#[derive(Debug, Serialize)]
pub struct TwilioMediaOut<'a> {
    pub event: &'static str,
    pub media: TwilioMediaBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct TwilioMediaBody<'a> {
    pub payload: &'a str,
}
