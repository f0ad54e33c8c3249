//! Error types for the voicelink client

use thiserror::Error;

/// Result type alias for voicelink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voicelink client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error (capture or playback hardware)
    #[error("audio error: {0}")]
    Audio(String),

    /// Microphone capture error
    #[error("capture error: {0}")]
    Capture(String),

    /// Decoding of an assembled audio unit failed
    #[error("decode error: {0}")]
    Decode(String),

    /// Transport error (connect failure, mid-session close)
    #[error("transport error: {0}")]
    Transport(String),

    /// Protocol anomaly (malformed or unexpected inbound message)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
