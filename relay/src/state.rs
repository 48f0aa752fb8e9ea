use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::elevenlabs::ElevenLabsConnector;
use crate::core::link::OutboundConnector;
use crate::core::notifier::TranscriptNotifier;
use crate::errors::RelayResult;

/// Shared state handed to every request handler.
pub struct AppState {
    pub config: ServerConfig,
    /// Opens the agent side of each relay session
    pub connector: Arc<dyn OutboundConnector>,
    pub notifier: TranscriptNotifier,
}

impl AppState {
    /// Build state that connects sessions to the configured ElevenLabs agent.
    pub fn new(config: ServerConfig) -> RelayResult<Arc<Self>> {
        let connector = Arc::new(ElevenLabsConnector::new(config.elevenlabs_config()));
        Self::with_connector(config, connector)
    }

    /// Build state around a caller-supplied connector.
    pub fn with_connector(
        config: ServerConfig,
        connector: Arc<dyn OutboundConnector>,
    ) -> RelayResult<Arc<Self>> {
        let notifier = TranscriptNotifier::new(
            config.transcript_ingest_url.clone(),
            config.transcript_timeout(),
        )?;

        Ok(Arc::new(Self {
            config,
            connector,
            notifier,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_without_any_external_config() {
        let state = AppState::new(ServerConfig::default()).unwrap();
        assert!(!state.notifier.is_enabled());
        assert_eq!(state.config.port, crate::config::DEFAULT_PORT);
    }

    #[test]
    fn test_new_with_ingest_url_enables_notifier() {
        let mut config = ServerConfig::default();
        config.transcript_ingest_url = Some("http://127.0.0.1:9/ingest".to_string());
        let state = AppState::new(config).unwrap();
        assert!(state.notifier.is_enabled());
    }
}
