use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {}ms: {what}", .after.as_millis())]
    Timeout { what: String, after: Duration },

    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Operation not supported by this renderer: {0}")]
    Unsupported(&'static str),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn navigation(url: &str, reason: impl ToString) -> Self {
        ScanError::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        ScanError::Timeout {
            what: what.into(),
            after,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
