//! Error types for the core library.

use thiserror::Error;

/// Main error type for the core library.
#[derive(Error, Debug)]
pub enum Error {
    /// No conversation is selected
    #[error("no conversation is selected")]
    NoCounterpart,

    /// Conversation history has not finished loading
    #[error("conversation is still loading")]
    NotReady,

    /// The counterpart has not approved messaging yet
    #[error("messaging with this counterpart is not approved yet")]
    NotApproved,

    /// Empty message body after trimming
    #[error("message cannot be empty")]
    EmptyMessage,

    /// A previous send is still awaiting acknowledgment
    #[error("a send is already in flight")]
    SendInFlight,

    /// Outbound message matched an already-sent message
    #[error("duplicate message blocked")]
    DuplicateMessage,

    /// Outbound message rejected by the rate ceiling
    #[error("sending too quickly, wait a moment")]
    Throttled,

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(String),

    /// Error reported by the platform API
    #[error("api error: {0}")]
    Api(String),

    /// Event channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}
