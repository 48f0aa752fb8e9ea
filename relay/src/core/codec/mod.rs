//! Frame codec.
//!
//! Pure translation between the telephony frames, the agent frames and the
//! internal [`AudioChunk`]. Nothing here holds state between calls.
//!
//! ```text
//! Twilio  {"event":"media","media":{"payload":P}}  --decode_inbound-->  AudioChunk(P)
//! AudioChunk(P)  --encode_for_outbound-->  {"audio":P}                         Agent
//! Agent   {"audio":P}  --decode_outbound-->  AudioChunk(P)
//! AudioChunk(P)  --encode_for_inbound-->  {"event":"media","media":{"payload":P}}  Twilio
//! ```

pub mod messages;

use thiserror::Error;

use messages::{AgentAudio, AgentFrame, TwilioMediaBody, TwilioMediaOut, TwilioMessage};

/// Errors produced while decoding or encoding a frame.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Not JSON, or JSON of the wrong shape
    #[error("Invalid frame: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// A recognised frame missing a field the relay needs
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Serializing an envelope failed
    #[error("Failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Where an audio chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Caller audio from the telephony stream
    Caller,
    /// Agent audio from the conversational service
    Agent,
}

/// Opaque encoded audio in transit. Never retained after forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub payload: String,
    pub origin: Origin,
}

/// A decoded telephony frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The stream started. Carries `start.callSid`, falling back to `start.streamSid`.
    StreamStart { call_identifier: Option<String> },
    /// Caller audio, plus the frame's top-level `streamSid` when present
    MediaChunk {
        chunk: AudioChunk,
        stream_sid: Option<String>,
    },
    /// Anything the relay does not act on
    Other,
}

/// A decoded agent frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    AudioChunk(AudioChunk),
    Other,
}

/// Decode a frame received from the telephony stream.
pub fn decode_inbound(raw: &str) -> Result<InboundEvent, CodecError> {
    let message: TwilioMessage = serde_json::from_str(raw).map_err(CodecError::InvalidJson)?;

    match message {
        TwilioMessage::Start { start, .. } => {
            let call_identifier = start.and_then(|s| s.call_sid.or(s.stream_sid));
            Ok(InboundEvent::StreamStart { call_identifier })
        }
        TwilioMessage::Media { media, stream_sid } => {
            let payload = media
                .and_then(|m| m.payload)
                .filter(|p| !p.is_empty())
                .ok_or(CodecError::MissingField("media.payload"))?;
            Ok(InboundEvent::MediaChunk {
                chunk: AudioChunk {
                    payload,
                    origin: Origin::Caller,
                },
                stream_sid,
            })
        }
        TwilioMessage::Unrecognized => Ok(InboundEvent::Other),
    }
}

/// Decode a frame received from the agent.
pub fn decode_outbound(raw: &str) -> Result<OutboundEvent, CodecError> {
    let frame: AgentFrame = serde_json::from_str(raw).map_err(CodecError::InvalidJson)?;

    Ok(match frame.audio.filter(|a| !a.is_empty()) {
        Some(payload) => OutboundEvent::AudioChunk(AudioChunk {
            payload,
            origin: Origin::Agent,
        }),
        None => OutboundEvent::Other,
    })
}

/// Wrap a payload in the agent's envelope.
pub fn encode_for_outbound(payload: &str) -> Result<String, CodecError> {
    serde_json::to_string(&AgentAudio { audio: payload }).map_err(CodecError::Encode)
}

/// Wrap a payload in a telephony media frame.
pub fn encode_for_inbound(payload: &str) -> Result<String, CodecError> {
    serde_json::to_string(&TwilioMediaOut {
        event: "media",
        media: TwilioMediaBody { payload },
    })
    .map_err(CodecError::Encode)
}
