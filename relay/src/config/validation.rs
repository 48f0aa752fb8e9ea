//! Configuration validation logic

use url::Url;

use super::ServerConfig;

/// Hard checks. A failure here stops the server from starting.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.elevenlabs_connect_timeout_seconds == 0 {
        return Err("ELEVEN_CONNECT_TIMEOUT_SECONDS must be greater than zero".into());
    }
    if config.transcript_timeout_seconds == 0 {
        return Err("TRANSCRIPT_TIMEOUT_SECONDS must be greater than zero".into());
    }
    Ok(())
}

/// Soft checks, reported as warnings by `main`.
pub(super) fn startup_warnings(config: &ServerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match config.elevenlabs_ws_url.as_deref() {
        None => warnings.push(
            "ELEVEN_WS_URL is not set; every agent connection will fail".to_string(),
        ),
        Some(raw) => match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
            Ok(url) => warnings.push(format!(
                "ELEVEN_WS_URL uses scheme {:?}, expected ws or wss",
                url.scheme()
            )),
            Err(e) => warnings.push(format!("ELEVEN_WS_URL is not a valid URL: {e}")),
        },
    }

    if config.elevenlabs_api_key.is_none() {
        warnings.push(
            "ELEVEN_API_KEY is not set; every agent connection will fail".to_string(),
        );
    }

    // Unset is fine: notifications are skipped per chunk
    if let Some(raw) = config.transcript_ingest_url.as_deref() {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => warnings.push(format!(
                "SUPABASE_TRANSCRIPT_INGEST_URL uses scheme {:?}, expected http or https",
                url.scheme()
            )),
            Err(e) => warnings.push(format!(
                "SUPABASE_TRANSCRIPT_INGEST_URL is not a valid URL: {e}"
            )),
        }
    }

    warnings
}
