//! Twilio WebSocket route configuration

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::handlers::twilio::twilio_handler;
use crate::state::AppState;

/// Create the Twilio Media Streams router
///
/// # Endpoint
///
/// `GET /twilio` - WebSocket upgrade for one Twilio media stream
///
/// # Protocol
///
/// Twilio sends JSON text frames:
/// - `{"event":"start","start":{"callSid":"CA..."},"streamSid":"MZ..."}`
/// - `{"event":"media","media":{"payload":"<base64 mulaw>"},"streamSid":"MZ..."}`
///
/// Agent audio is sent back as:
/// - `{"event":"media","media":{"payload":"<base64 mulaw>"}}`
pub fn create_twilio_router() -> Router<Arc<AppState>> {
    Router::new().route("/twilio", get(twilio_handler))
}
