//! Weather error types.

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HKO returned {status} for {url}")]
    Upstream { url: String, status: u16 },

    #[error("Failed to parse radar data from HKO: {0}")]
    RadarIndex(#[from] serde_json::Error),

    /// The requested range is not in the radar index.
    #[error("Invalid or missing radar data for 'range{range}'.")]
    UnknownRange { range: String, available: Vec<String> },

    #[error("No radar images found for range{range}.")]
    NoImages { range: String },

    #[error("Could not parse radar image filename: {0}")]
    ImagePath(String),

    #[error("Failed to describe radar image: {0}")]
    Llm(#[from] LlmError),
}
