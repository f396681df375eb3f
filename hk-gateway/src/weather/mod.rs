//! Hong Kong Observatory weather data.
//!
//! Text summaries come from three RSS feeds; radar imagery comes from the
//! radar page's JSON image index.

mod client;
mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod radar;
pub mod rss;
mod service;

pub use client::HkoClient;
pub use error::WeatherError;
pub use radar::{RADAR_PROMPT, RadarReport};
pub use rss::Feed;
pub use service::{WeatherService, WeatherSummary};
