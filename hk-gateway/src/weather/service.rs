//! Weather summaries and radar analysis.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use moka::future::Cache as MokaCache;
use serde::Serialize;
use tracing::{error, info};

use crate::llm::{ImageInput, LlmClient};
use crate::notify::TelegramNotifier;

use super::client::HkoClient;
use super::error::WeatherError;
use super::radar::{self, RADAR_PROMPT, RadarReport};
use super::rss::{self, Feed};

/// Cleaned text of the three HKO feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSummary {
    pub weather_warning_summary: String,
    pub local_weather_forecast: String,
    pub several_days_weather_forecast: String,
}

/// HKO data with a short-lived summary cache.
#[derive(Clone)]
pub struct WeatherService {
    hko: HkoClient,
    summaries: MokaCache<(), Arc<WeatherSummary>>,
    llm: LlmClient,
    notifier: Option<TelegramNotifier>,
    inline_image: bool,
}

impl WeatherService {
    pub fn new(
        hko: HkoClient,
        cache_ttl: Duration,
        llm: LlmClient,
        notifier: Option<TelegramNotifier>,
        inline_image: bool,
    ) -> Self {
        let summaries = MokaCache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(1)
            .build();
        Self {
            hko,
            summaries,
            llm,
            notifier,
            inline_image,
        }
    }

    /// Current summary. Any feed failing fails the whole summary.
    pub async fn summary(&self) -> Result<Arc<WeatherSummary>, WeatherError> {
        if let Some(cached) = self.summaries.get(&()).await {
            return Ok(cached);
        }

        let feeds = try_join_all(Feed::ALL.map(|feed| self.hko.fetch_feed(feed))).await?;
        let mut texts = feeds.iter().map(|xml| rss::extract_summary(xml));
        let summary = Arc::new(WeatherSummary {
            weather_warning_summary: texts.next().unwrap_or_default(),
            local_weather_forecast: texts.next().unwrap_or_default(),
            several_days_weather_forecast: texts.next().unwrap_or_default(),
        });

        self.summaries.insert((), summary.clone()).await;
        Ok(summary)
    }

    /// Describe the newest radar image for `range`.
    ///
    /// With Telegram configured the image and the description are also
    /// forwarded in the background; forwarding failures are only logged.
    pub async fn analyze_radar(&self, range: &str) -> Result<RadarReport, WeatherError> {
        let index = self.hko.fetch_radar_index().await?;
        let path = radar::latest_image_path(&index, range)?;
        let image_url = self.hko.radar_image_url(&path);
        let bytes = self.hko.fetch_bytes(&image_url).await?;
        info!(range, url = %image_url, bytes = bytes.len(), "Fetched latest radar image");

        if let Some(notifier) = self.notifier.clone() {
            let photo = bytes.clone();
            let caption = radar::photo_caption(range);
            tokio::spawn(async move {
                match notifier.send_photo(photo, &caption).await {
                    Ok(()) => info!("Radar image sent to Telegram"),
                    Err(e) => error!(error = %e, "Error sending radar image to Telegram"),
                }
            });
        }

        let image = if self.inline_image {
            ImageInput::Inline {
                bytes,
                mime: "image/jpeg".to_string(),
            }
        } else {
            ImageInput::Url(image_url.clone())
        };
        let description = self.llm.describe_image(RADAR_PROMPT, &image).await?;
        info!(range, model = self.llm.model(), "Radar image described");

        if let Some(notifier) = self.notifier.clone() {
            let text = radar::description_message(&description);
            tokio::spawn(async move {
                match notifier.send_message(&text).await {
                    Ok(()) => info!("Weather description sent to Telegram"),
                    Err(e) => error!(error = %e, "Error sending weather description to Telegram"),
                }
            });
        }

        Ok(RadarReport {
            range: range.to_string(),
            radar_image_url: image_url,
            weather_description: description,
        })
    }
}
