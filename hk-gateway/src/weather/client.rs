//! HKO HTTP client.

use std::time::Duration;

use serde_json::Value;

use crate::config::WeatherSettings;

use super::error::WeatherError;
use super::radar;
use super::rss::Feed;

#[derive(Debug, Clone)]
pub struct HkoClient {
    http: reqwest::Client,
    rss_base_url: String,
    radar_base_url: String,
}

impl HkoClient {
    pub fn new(settings: &WeatherSettings, timeout: Duration) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            rss_base_url: settings.rss_base_url.trim_end_matches('/').to_string(),
            radar_base_url: settings.radar_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn feed_url(&self, feed: Feed) -> String {
        format!("{}/{}", self.rss_base_url, feed.file_name())
    }

    pub fn radar_index_url(&self) -> String {
        format!("{}/temp_json/iradar_img.json", self.radar_base_url)
    }

    /// Absolute URL of an image path from the radar index.
    pub fn radar_image_url(&self, path: &str) -> String {
        radar::image_url(&self.radar_base_url, path)
    }

    /// Raw XML of one feed.
    pub async fn fetch_feed(&self, feed: Feed) -> Result<String, WeatherError> {
        let response = self.get(&self.feed_url(feed)).await?;
        Ok(response.text().await?)
    }

    pub async fn fetch_radar_index(&self) -> Result<Value, WeatherError> {
        let response = self.get(&self.radar_index_url()).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, WeatherError> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, WeatherError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Upstream {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}
