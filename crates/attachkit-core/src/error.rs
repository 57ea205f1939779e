use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    /// The resource behind a URL could not be retrieved.
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    /// The external frame decoder failed or is unavailable.
    #[error("decoder error: {0}")]
    Decoder(String),

    #[error("{operation} timed out after {after:?}")]
    TimedOut {
        operation: &'static str,
        after: Duration,
    },
}

impl MediaError {
    pub fn is_network(&self) -> bool {
        matches!(self, MediaError::Network(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, MediaError::TimedOut { .. })
    }
}
