use std::fmt;
use std::time::Duration;

use zeroize::Zeroizing;

/// Header carrying the agent API key on the WebSocket handshake.
pub const API_KEY_HEADER: &str = "xi-api-key";

/// Default bound on the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the conversational agent.
///
/// Both `ws_url` and `api_key` may be absent: the relay still starts, and every
/// connect attempt fails with a connect error.
#[derive(Clone)]
pub struct ElevenLabsConfig {
    /// Full WebSocket URL, including any agent query parameters
    pub ws_url: Option<String>,
    /// Sent as the `xi-api-key` header, wiped from memory on drop
    pub api_key: Option<Zeroizing<String>>,
    /// Handshake timeout
    pub connect_timeout: Duration,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            api_key: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// Keep the key out of logs
impl fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("ws_url", &self.ws_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
