//! Client error types

use thiserror::Error;

/// Client error type
///
/// Every variant is a transport-level failure for one relay session. The
/// fan-out layer contains these per endpoint; they never abort sibling
/// sessions.
#[derive(Error, Debug)]
pub enum ClientError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
