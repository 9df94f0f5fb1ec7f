use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FirecrawlError>;

#[derive(Debug, Error)]
pub enum FirecrawlError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Search was not successful: {0}")]
    Unsuccessful(String),
}

impl FirecrawlError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FirecrawlError::Timeout(_))
    }
}
