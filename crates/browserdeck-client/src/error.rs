//! Error types for the synchronization client.

use thiserror::Error;

/// Errors that can occur when talking to the agent backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to establish a connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("API error: HTTP {status} on {path}")]
    Api { status: u16, path: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
