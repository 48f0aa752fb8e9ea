//! Transcript side-channel.
//!
//! Every forwarded caller chunk produces a placeholder transcript line that is
//! POSTed to the ingest endpoint. Delivery is fire-and-forget: the request runs
//! on a detached task, failures are logged and dropped, and nothing on the
//! forwarding path ever waits for it.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{RelayError, RelayResult};

/// Placeholder text until real speech-to-text exists.
pub const PLACEHOLDER_TEXT: &str = "[audio chunk]";

/// Speaker tag for caller audio.
pub const CALLER_SPEAKER: &str = "user";

/// Identifier used when neither the session nor the frame knows the call.
pub const UNKNOWN_CALL_ID: &str = "unknown";

/// Body of the ingest request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    #[serde(rename = "callId")]
    pub call_id: String,
    pub text: String,
    pub speaker: String,
}

impl NotificationEvent {
    /// Placeholder line for one chunk of caller audio.
    pub fn caller_chunk(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            text: PLACEHOLDER_TEXT.to_string(),
            speaker: CALLER_SPEAKER.to_string(),
        }
    }
}

/// Outcome of handing an event to the notifier.
///
/// The session driver drops this immediately, which detaches the task.
#[derive(Debug)]
pub enum NotifyDispatch {
    /// Request spawned in the background
    Spawned(JoinHandle<()>),
    /// No ingest endpoint configured
    Skipped,
}

/// Best-effort HTTP sink for transcript lines.
#[derive(Debug, Clone)]
pub struct TranscriptNotifier {
    ingest_url: Option<String>,
    client: reqwest::Client,
}

impl TranscriptNotifier {
    /// Create a notifier. `ingest_url` of `None` disables delivery.
    pub fn new(ingest_url: Option<String>, timeout: Duration) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Configuration(format!("transcript HTTP client: {e}")))?;

        Ok(Self { ingest_url, client })
    }

    /// Check if an ingest endpoint is configured
    pub fn is_enabled(&self) -> bool {
        self.ingest_url.is_some()
    }

    /// Send `event` without waiting for the result.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, event: NotificationEvent) -> NotifyDispatch {
        let Some(url) = self.ingest_url.clone() else {
            warn!("SUPABASE_TRANSCRIPT_INGEST_URL not set, skipping transcript POST");
            return NotifyDispatch::Skipped;
        };

        let request = self.client.post(&url).json(&event);
        let call_id = event.call_id;

        NotifyDispatch::Spawned(tokio::spawn(async move {
            let result = match request.send().await {
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) => Err(RelayError::Notification(format!(
                    "HTTP {}",
                    response.status()
                ))),
                Err(e) => Err(RelayError::Notification(e.to_string())),
            };

            match result {
                Ok(()) => debug!(call_id = %call_id, "Transcript line delivered"),
                Err(e) => warn!(call_id = %call_id, url = %url, error = %e, "Error posting transcript"),
            }
        }))
    }
}
