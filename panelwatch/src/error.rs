//! Error types for the panel client, the telemetry channel and TLS setup.

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the panel's REST API.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("invalid panel URL {0}: {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("panel request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("panel returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Failures of a single telemetry channel. None of these outlive the channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no API key configured for server {0}")]
    MissingApiKey(String),

    #[error("channel was already opened")]
    AlreadyOpened,

    #[error("fetching socket credentials failed: {0}")]
    Credentials(#[from] PanelError),

    #[error("connection attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ChannelError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(e: serde_json::Error) -> Self {
        ChannelError::Malformed(e.to_string())
    }
}

/// Problems loading a custom CA bundle.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read CA bundle {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("no certificates found in {0}")]
    Empty(PathBuf),

    #[error("rejected certificate in {0}: {1}")]
    Rustls(PathBuf, rustls::Error),

    #[error("tls configuration: {0}")]
    Config(String),
}
