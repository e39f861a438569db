use thiserror::Error;

/// Result type for Mozart operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a Mozart device or handling its entities
#[derive(Error, Debug)]
pub enum Error {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection was closed unexpectedly
    #[error("Connection closed")]
    ConnectionClosed,

    /// Request timed out waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Device API returned an error response
    #[error("API error: {detail}")]
    Api {
        /// Error detail message from the API
        detail: String,
    },

    /// The device reported data the API models do not know about yet
    #[error("API is outdated compared to the device: {detail}")]
    OutdatedApi { detail: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed Beolink JID
    #[error("Invalid Beolink JID: {0}")]
    InvalidJid(String),

    /// Configuration value out of range or missing
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown command name
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Command or service parameter could not be used
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}
