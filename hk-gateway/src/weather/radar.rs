//! Radar image index parsing.
//!
//! The index at `temp_json/iradar_img.json` looks like
//! `{"radar": {"range2": {"image": ["picture[2][0]=\"rad_064_png/...jpg\";", ...]}}}`
//! with images oldest first.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::error::WeatherError;

pub const RADAR_PROMPT: &str =
    "Describe the Current Weather Conditions from this radar image. No need to describe legends.";

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""(.*?)""#).expect("valid regex"));

/// Result of a radar analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarReport {
    pub range: String,
    pub radar_image_url: String,
    pub weather_description: String,
}

/// Range numbers present in the index, in index order.
pub fn available_ranges(index: &Value) -> Vec<String> {
    index
        .get("radar")
        .and_then(Value::as_object)
        .map(|radar| {
            radar
                .keys()
                .filter_map(|k| k.strip_prefix("range"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Relative path of the newest image for `range`.
pub fn latest_image_path(index: &Value, range: &str) -> Result<String, WeatherError> {
    let images = index
        .get("radar")
        .and_then(|r| r.get(format!("range{range}")))
        .and_then(|r| r.get("image"))
        .filter(|i| !i.is_null())
        .ok_or_else(|| WeatherError::UnknownRange {
            range: range.to_string(),
            available: available_ranges(index),
        })?;

    let latest = images
        .as_array()
        .and_then(|a| a.last())
        .ok_or_else(|| WeatherError::NoImages {
            range: range.to_string(),
        })?;

    let entry = latest.as_str().unwrap_or_default();
    QUOTED
        .captures(entry)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| WeatherError::ImagePath(entry.to_string()))
}

pub fn image_url(radar_base_url: &str, path: &str) -> String {
    format!("{}/{}", radar_base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub fn photo_caption(range: &str) -> String {
    format!("HKO Radar Image (Range: {range})")
}

pub fn description_message(description: &str) -> String {
    format!("Current Weather Conditions:\n\n{description}")
}
