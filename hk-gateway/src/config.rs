//! Runtime configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::domain::AreaMatcher;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// KMB bus data settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmbSettings {
    pub base_url: String,
    pub home_stop_names: Vec<String>,
    pub work_stop_names: Vec<String>,
    /// Stop whose routes are hidden at the secondary stop
    pub home_primary_stop: String,
    pub home_secondary_stop: String,
    pub refresh_interval: Duration,
    /// `None` keeps the cache in memory only
    pub cache_path: Option<PathBuf>,
}

impl KmbSettings {
    pub fn home_matcher(&self) -> AreaMatcher {
        AreaMatcher::new(&self.home_stop_names)
    }

    pub fn work_matcher(&self) -> AreaMatcher {
        AreaMatcher::new(&self.work_stop_names)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherSettings {
    pub rss_base_url: String,
    pub radar_base_url: String,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Send the radar image inline as a data URL instead of by link
    pub inline_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base_url: String,
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub kmb: KmbSettings,
    pub weather: WeatherSettings,
    pub llm: LlmSettings,
    /// `None` when no bot token or group is configured
    pub telegram: Option<TelegramSettings>,
    pub catalog_dir: PathBuf,
    pub static_dir: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:3000";
    const DEFAULT_KMB_BASE_URL: &'static str = "https://data.etabus.gov.hk/v1/transport/kmb";
    const DEFAULT_HOME_STOPS: &'static str =
        "KAM TAI COURT;CHEVALIER GARDEN (;CHEVALIER GARDEN BUS";
    const DEFAULT_WORK_STOPS: &'static str =
        "TSIM SHA TSUI BBI - HAIPHONG ROAD;KOWLOON PARK DRIVE;HANKOW ROAD BUS TERMINUS";
    const DEFAULT_REFRESH_SECS: u64 = 24 * 60 * 60;
    const DEFAULT_CACHE_PATH: &'static str = "kmb_cache.json";
    const DEFAULT_RSS_BASE_URL: &'static str = "https://rss.weather.gov.hk/rss";
    const DEFAULT_RADAR_BASE_URL: &'static str = "https://www.hko.gov.hk/wxinfo/radars";
    const DEFAULT_WEATHER_TTL_SECS: u64 = 60;
    const DEFAULT_LLM_BASE_URL: &'static str = "https://openrouter.ai/api/v1";
    const DEFAULT_LLM_MODEL: &'static str = "google/gemini-2.5-pro";
    const DEFAULT_TELEGRAM_BASE_URL: &'static str = "https://api.telegram.org";
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    /// Upper bound for every duration setting (ten years).
    const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let mut bind_addr: SocketAddr = env.parse("BIND_ADDR", Self::DEFAULT_BIND_ADDR)?;
        if let Some(port) = env.get("PORT") {
            bind_addr.set_port(parse_value("PORT", &port)?);
        }

        let home_stop_names =
            split_names(&env.or("KMB_HOME_STOP_NAMES", Self::DEFAULT_HOME_STOPS));
        let work_stop_names =
            split_names(&env.or("KMB_WORK_STOP_NAMES", Self::DEFAULT_WORK_STOPS));
        let home_primary_stop = env
            .get("KMB_HOME_PRIMARY_STOP")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|| home_stop_names.first().cloned().unwrap_or_default());
        let home_secondary_stop = env
            .get("KMB_HOME_SECONDARY_STOP")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|| home_stop_names.get(2).cloned().unwrap_or_default());

        let cache_path = env
            .get("KMB_CACHE_PATH")
            .unwrap_or_else(|| Self::DEFAULT_CACHE_PATH.to_string());
        let cache_path = (!cache_path.trim().is_empty()).then(|| PathBuf::from(cache_path));

        let kmb = KmbSettings {
            base_url: env.or("KMB_BASE_URL", Self::DEFAULT_KMB_BASE_URL),
            home_stop_names,
            work_stop_names,
            home_primary_stop,
            home_secondary_stop,
            refresh_interval: env.secs("KMB_REFRESH_INTERVAL_SECS", Self::DEFAULT_REFRESH_SECS)?,
            cache_path,
        };

        let weather = WeatherSettings {
            rss_base_url: env.or("HKO_RSS_BASE_URL", Self::DEFAULT_RSS_BASE_URL),
            radar_base_url: env.or("HKO_RADAR_BASE_URL", Self::DEFAULT_RADAR_BASE_URL),
            cache_ttl: env.secs("WEATHER_CACHE_TTL_SECS", Self::DEFAULT_WEATHER_TTL_SECS)?,
        };

        let llm = LlmSettings {
            api_key: env.get("OPENROUTER_API_KEY").filter(|k| !k.trim().is_empty()),
            base_url: env.or("LLM_BASE_URL", Self::DEFAULT_LLM_BASE_URL),
            model: env.or("LLM_MODEL", Self::DEFAULT_LLM_MODEL),
            inline_image: parse_bool("LLM_INLINE_IMAGE", env.get("LLM_INLINE_IMAGE"))?,
        };

        let telegram = match (
            env.get("TELEGRAM_BOT_TOKEN").filter(|s| !s.trim().is_empty()),
            env.get("TELEGRAM_GROUP_ID").filter(|s| !s.trim().is_empty()),
        ) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramSettings {
                bot_token,
                chat_id,
                api_base_url: env.or("TELEGRAM_API_BASE_URL", Self::DEFAULT_TELEGRAM_BASE_URL),
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            kmb,
            weather,
            llm,
            telegram,
            catalog_dir: PathBuf::from(env.or("CATALOG_DIR", ".")),
            static_dir: PathBuf::from(env.or("STATIC_DIR", "static")),
            http_timeout: env.secs("HTTP_TIMEOUT_SECS", Self::DEFAULT_HTTP_TIMEOUT_SECS)?,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
    }

    fn or(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, var: &'static str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        parse_value(var, &self.or(var, default))
    }

    /// A whole number of seconds, at least one and at most
    /// [`Config::MAX_DURATION_SECS`].
    fn secs(&self, var: &'static str, default: u64) -> Result<Duration, ConfigError> {
        let raw = self.or(var, &default.to_string());
        let secs: u64 = parse_value(var, &raw)?;
        let reason = if secs == 0 {
            "must be at least 1 second".to_string()
        } else if secs > Config::MAX_DURATION_SECS {
            format!("must be at most {} seconds", Config::MAX_DURATION_SECS)
        } else {
            return Ok(Duration::from_secs(secs));
        };
        Err(ConfigError::Invalid {
            var,
            value: raw,
            reason,
        })
    }
}

fn parse_value<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Unset or blank reads as false.
fn parse_bool(var: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if v.is_empty() || v == "false" || v == "0" => Ok(false),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) => Err(ConfigError::Invalid {
            var,
            value: v,
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Split a `;`-separated name list; blanks dropped, upper-cased.
fn split_names(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
