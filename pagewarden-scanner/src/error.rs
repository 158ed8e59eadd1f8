use crate::registry::PageStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("No element matches selector: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {millis}ms: {operation}")]
    Timeout { operation: String, millis: u128 },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Unsupported by this browser: {0}")]
    Unsupported(String),

    #[error("Illegal status transition for {url}: {from:?} -> {to:?}")]
    InvalidTransition {
        url: String,
        from: PageStatus,
        to: PageStatus,
    },

    #[error("Unknown page: {0}")]
    UnknownPage(String),

    #[error("Analyzer {analyzer} failed: {message}")]
    Analyzer { analyzer: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    pub fn timeout(operation: impl Into<String>, limit: std::time::Duration) -> Self {
        ScanError::Timeout {
            operation: operation.into(),
            millis: limit.as_millis(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
