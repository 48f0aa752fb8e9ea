//! Environment variable loading

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{
    DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS, DEFAULT_PORT, DEFAULT_TRANSCRIPT_TIMEOUT_SECONDS,
    ServerConfig, TlsConfig,
};

/// Read a variable, treating blank values as unset.
pub(super) fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse a variable, falling back to `default` when it is unset.
pub(super) fn parse_env_or<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| format!("Invalid value for {name} ({raw:?}): {e}").into()),
        None => Ok(default),
    }
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let tls = match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    };

    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        port: parse_env_or("PORT", DEFAULT_PORT)?,
        tls,
        elevenlabs_ws_url: env_var("ELEVEN_WS_URL"),
        elevenlabs_api_key: env_var("ELEVEN_API_KEY"),
        elevenlabs_connect_timeout_seconds: parse_env_or(
            "ELEVEN_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS,
        )?,
        transcript_ingest_url: env_var("SUPABASE_TRANSCRIPT_INGEST_URL"),
        transcript_timeout_seconds: parse_env_or(
            "TRANSCRIPT_TIMEOUT_SECONDS",
            DEFAULT_TRANSCRIPT_TIMEOUT_SECONDS,
        )?,
    })
}
