//! Error types for the HTTP transport layer.

/// Errors that can occur during HTTP header encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Base64 decoding failed.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}
