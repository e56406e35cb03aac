//! Error types for kantele.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Main error type for all gateway and REST operations.
#[derive(Debug, Error)]
pub enum KanteleError {
    /// WebSocket handshake against the gateway URL failed.
    #[error("Gateway connect error: {0}")]
    Connect(#[source] tungstenite::Error),

    /// WebSocket error while reading or writing frames.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Inbound frame could not be decoded into an envelope.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Frame decoded but violates the gateway protocol (bad Hello, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection (or its writer task) is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    /// `open()` was called while a connection is still active.
    #[error("Gateway connection already open")]
    AlreadyOpen,

    /// An event handler returned an error.
    #[error("Handler for event {event} failed: {source}")]
    Handler {
        event: String,
        #[source]
        source: Box<KanteleError>,
    },

    /// REST API answered with a non-success status.
    #[error("invalid response: CODE: {status} METHOD: {method} PATH: {path} URL: {url}")]
    Http {
        status: u16,
        method: reqwest::Method,
        path: String,
        url: String,
    },

    /// REST request could not be sent or its response not received.
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A connection task panicked or was aborted.
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using KanteleError.
pub type Result<T> = std::result::Result<T, KanteleError>;
