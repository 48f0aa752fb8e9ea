//! HTTP and WebSocket request handlers
//!
//! - `api` - Liveness check and 404 fallback
//! - `twilio` - Twilio Media Streams WebSocket relay

pub mod api;
pub mod twilio;

pub use api::{health_check, not_found, root};
pub use twilio::twilio_handler;
