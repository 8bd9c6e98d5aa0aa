//! Client error types

use thiserror::Error;

/// Why the AI advisor produced no usable reply. Every variant is recovered by
/// playing a random legal move.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Advisor not configured: no API key")]
    NotConfigured,

    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Empty response from advisor")]
    EmptyResponse,

    #[error("Advisor response parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("No clipboard available")]
    Unavailable,

    #[error("Clipboard command failed: {0}")]
    Command(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
