//! Merging YAML and environment configurations

use std::path::PathBuf;

use super::ServerConfig;
use super::TlsConfig;
use super::env::load_from_env;
use super::yaml::YamlConfig;

/// Start from the environment and overlay any value the YAML file provides.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                _ => {
                    if let (Some(cert), Some(key)) = (tls.cert_path, tls.key_path) {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    } else if tls.enabled == Some(true) && config.tls.is_none() {
                        return Err(
                            "server.tls.enabled is true but cert_path or key_path is missing"
                                .into(),
                        );
                    }
                }
            }
        }
    }

    if let Some(agent) = yaml.agent {
        if agent.ws_url.is_some() {
            config.elevenlabs_ws_url = agent.ws_url;
        }
        if agent.api_key.is_some() {
            config.elevenlabs_api_key = agent.api_key;
        }
        if let Some(timeout) = agent.connect_timeout_seconds {
            config.elevenlabs_connect_timeout_seconds = timeout;
        }
    }

    if let Some(transcripts) = yaml.transcripts {
        if transcripts.ingest_url.is_some() {
            config.transcript_ingest_url = transcripts.ingest_url;
        }
        if let Some(timeout) = transcripts.timeout_seconds {
            config.transcript_timeout_seconds = timeout;
        }
    }

    Ok(config)
}
