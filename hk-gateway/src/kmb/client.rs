//! KMB HTTP client.

use serde::de::DeserializeOwned;

use crate::domain::RouteKey;

use super::error::KmbError;
use super::types::{EtaDto, RouteStopDto, StopDto};

/// Default base URL for the KMB open-data API.
const DEFAULT_BASE_URL: &str = "https://data.etabus.gov.hk/v1/transport/kmb";

/// Configuration for the KMB client.
#[derive(Debug, Clone)]
pub struct KmbClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl KmbClientConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for KmbClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the KMB open-data API.
#[derive(Debug, Clone)]
pub struct KmbClient {
    http: reqwest::Client,
    base_url: String,
}

impl KmbClient {
    pub fn new(config: KmbClientConfig) -> Result<Self, KmbError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full stop directory.
    pub async fn fetch_stops(&self) -> Result<Vec<StopDto>, KmbError> {
        let url = format!("{}/stop", self.base_url);
        self.get_data(&url).await
    }

    /// Fetch live arrival predictions for one stop.
    pub async fn fetch_stop_eta(&self, stop_id: &str) -> Result<Vec<EtaDto>, KmbError> {
        let url = format!("{}/stop-eta/{}", self.base_url, stop_id);
        self.get_data(&url).await
    }

    /// Fetch a route's stops in travel order.
    pub async fn fetch_route_stops(&self, key: &RouteKey) -> Result<Vec<RouteStopDto>, KmbError> {
        let url = format!(
            "{}/route-stop/{}/{}/{}",
            self.base_url,
            key.route,
            key.direction.as_str(),
            key.service_type
        );
        self.get_data(&url).await
    }

    /// GET `url` and decode the `data` array of the response envelope.
    async fn get_data<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, KmbError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KmbError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        decode_envelope(url, &body)
    }
}

/// Decode `{"data": [...]}`. A body whose `data` is missing or not an
/// array is reported as [`KmbError::Malformed`].
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    url: &str,
    body: &str,
) -> Result<Vec<T>, KmbError> {
    let mut envelope: serde_json::Value =
        serde_json::from_str(body).map_err(|e| KmbError::Json {
            message: e.to_string(),
        })?;

    let data = envelope
        .get_mut("data")
        .map(serde_json::Value::take)
        .filter(serde_json::Value::is_array)
        .ok_or_else(|| KmbError::Malformed {
            url: url.to_string(),
        })?;

    serde_json::from_value(data).map_err(|e| KmbError::Json {
        message: e.to_string(),
    })
}
