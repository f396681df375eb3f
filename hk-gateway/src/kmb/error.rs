//! KMB API error types.

/// Errors that can occur when talking to the KMB API.
#[derive(Debug, thiserror::Error)]
pub enum KmbError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body was not JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// JSON parsed but the envelope has no `data` array
    #[error("unexpected response format from {url}")]
    Malformed { url: String },
}
