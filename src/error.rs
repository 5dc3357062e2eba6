use thiserror::Error;

/// Custom error types for the ticks server
#[derive(Debug, Error)]
pub enum TicksError {
    /// Inbound event errors
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid room code: {0:?}")]
    InvalidRoomCode(String),

    #[error("Client identifier must not be empty")]
    InvalidClientId,

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigurationParseFailed(String),

    /// Hub and transport errors
    #[error("Presence hub is no longer running")]
    HubUnavailable,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using TicksError
pub type Result<T> = std::result::Result<T, TicksError>;

impl TicksError {
    /// Helper to create malformed payload errors with context
    pub fn malformed(msg: impl Into<String>) -> Self {
        TicksError::MalformedPayload(msg.into())
    }

    /// Helper to create network errors
    pub fn network(msg: impl Into<String>) -> Self {
        TicksError::NetworkError(msg.into())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TicksError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TicksError::NetworkError(err.to_string())
    }
}
