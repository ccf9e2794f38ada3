//! Failures a search can end in.
//!
//! Transport and upstream failures are absorbed by the session and shown on
//! the page; `Validation` is the only variant raised before a request is sent.
//! Network errors never carry the request URL, since it holds the API key.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetcherError {
    /// Connection, timeout or body read failure (URL stripped)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx status from the search endpoint
    #[error("API error: {code} - {message}")]
    Api { code: u16, message: String },

    /// Body parsed, but not into a `search-results` envelope we understand
    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Bad environment value or unusable base URL
    #[error("Config error: {0}")]
    Config(String),

    /// Form values refused before any request is issued
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, FetcherError>;

/// Turns a missing JSON member into a [`FetcherError::ResponseShape`]
pub trait OptionExt<T> {
    fn ok_or_shape(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_shape(self, what: &str) -> Result<T> {
        self.ok_or_else(|| FetcherError::ResponseShape(what.to_string()))
    }
}
