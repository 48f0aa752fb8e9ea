//! Configuration module for the BellKeeper relay
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//! The configuration is read once at startup and passed down explicitly; nothing below
//! `main` reads the environment.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use bellkeeper_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Relay listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

use zeroize::Zeroizing;

use crate::core::elevenlabs::{DEFAULT_CONNECT_TIMEOUT, ElevenLabsConfig};

/// Default listening port, matching the hosting platform's default
pub const DEFAULT_PORT: u16 = 10000;

/// Default bound on the agent WebSocket handshake
pub const DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS: u64 = DEFAULT_CONNECT_TIMEOUT.as_secs();

/// Default per-request timeout for transcript POSTs
pub const DEFAULT_TRANSCRIPT_TIMEOUT_SECONDS: u64 = 5;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything the relay needs:
/// - Server settings (host, port, TLS)
/// - Conversational agent connection (URL, API key, handshake timeout)
/// - Transcript ingest endpoint
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Conversational agent
    /// WebSocket URL of the ElevenLabs conversational agent (`ELEVEN_WS_URL`)
    pub elevenlabs_ws_url: Option<String>,
    /// ElevenLabs API key sent as `xi-api-key` (`ELEVEN_API_KEY`)
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_connect_timeout_seconds: u64,

    // Transcript side-channel
    /// Endpoint receiving placeholder transcript lines (`SUPABASE_TRANSCRIPT_INGEST_URL`)
    pub transcript_ingest_url: Option<String>,
    pub transcript_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tls: None,
            elevenlabs_ws_url: None,
            elevenlabs_api_key: None,
            elevenlabs_connect_timeout_seconds: DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS,
            transcript_ingest_url: None,
            transcript_timeout_seconds: DEFAULT_TRANSCRIPT_TIMEOUT_SECONDS,
        }
    }
}

/// Zeroize the agent API key when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.elevenlabs_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The `.env` file is loaded by `main` before this is called, so values from it are
    /// visible here as regular environment variables.
    ///
    /// # Errors
    /// Returns an error if a numeric variable cannot be parsed, TLS is half configured,
    /// or validation fails. Missing agent settings are *not* an error; see
    /// [`ServerConfig::startup_warnings`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if the YAML file cannot be read or is malformed, environment
    /// variables have invalid formats, or validation fails.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Connection settings for the agent connector
    ///
    /// The key copy handed to the connector is wiped when the connector is dropped.
    pub fn elevenlabs_config(&self) -> ElevenLabsConfig {
        ElevenLabsConfig {
            ws_url: self.elevenlabs_ws_url.clone(),
            api_key: self.elevenlabs_api_key.clone().map(Zeroizing::new),
            connect_timeout: Duration::from_secs(self.elevenlabs_connect_timeout_seconds),
        }
    }

    /// Per-request timeout for transcript POSTs
    pub fn transcript_timeout(&self) -> Duration {
        Duration::from_secs(self.transcript_timeout_seconds)
    }

    /// Problems worth a warning at startup that do not stop the server.
    ///
    /// A relay without agent settings still binds its port; every session's
    /// agent connect will then fail.
    pub fn startup_warnings(&self) -> Vec<String> {
        validation::startup_warnings(self)
    }
}
