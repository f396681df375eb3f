//! A local stand-in for the HKO, LLM and Telegram endpoints.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::config::{TelegramSettings, WeatherSettings};
use crate::llm::LlmClient;
use crate::notify::TelegramNotifier;
use crate::weather::{HkoClient, WeatherService};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
pub struct Upstream {
    pub feed_hits: Arc<AtomicUsize>,
    pub llm_requests: Arc<Mutex<Vec<Value>>>,
    pub telegram_calls: Arc<Mutex<Vec<String>>>,
    pub fail_feeds: bool,
    /// Serve a radar index that is not JSON.
    pub malformed_index: bool,
}

async fn feed(State(up): State<Upstream>, Path(file): Path<String>) -> impl IntoResponse {
    up.feed_hits.fetch_add(1, Ordering::SeqCst);
    if up.fail_feeds {
        return (StatusCode::BAD_GATEWAY, String::new());
    }
    let text = match file.as_str() {
        "WeatherWarningSummaryv2_uc.xml" => "現時 並無 警告",
        "LocalWeatherForecast_uc.xml" => "天氣 晴朗",
        _ => "明日 有 雨",
    };
    (
        StatusCode::OK,
        format!(
            "<rss><channel><item><description><![CDATA[<p>{text}</p>]]></description></item></channel></rss>"
        ),
    )
}

async fn radar_index(State(up): State<Upstream>) -> String {
    if up.malformed_index {
        return "var radar = {range2:".to_string();
    }
    json!({"radar": {"range2": {"image": [
        "picture[2][0]=\"rad_064_png/old.jpg\";",
        "picture[2][1]=\"rad_064_png/new.jpg\";"
    ]}, "range3": {"image": ["picture[3][0]=\"rad_256_png/x.jpg\";"]}}})
    .to_string()
}

async fn image() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF]
}

async fn chat(State(up): State<Upstream>, Json(body): Json<Value>) -> Json<Value> {
    up.llm_requests.lock().unwrap().push(body);
    Json(json!({"choices": [{"message": {"content": "Scattered showers."}}]}))
}

async fn telegram(
    State(up): State<Upstream>,
    Path((_bot, method)): Path<(String, String)>,
) -> Json<Value> {
    up.telegram_calls.lock().unwrap().push(method);
    Json(json!({"ok": true}))
}

/// Serve the fake upstream; returns its base URL.
pub async fn spawn(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/rss/:file", get(feed))
        .route("/radars/temp_json/iradar_img.json", get(radar_index))
        .route("/radars/rad_064_png/new.jpg", get(image))
        .route("/llm/chat/completions", post(chat))
        .route("/tg/:bot/:method", post(telegram))
        .with_state(upstream);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

/// A weather service wired to the fake upstream at `base`.
pub fn weather_service(base: &str, telegram: bool, inline_image: bool) -> WeatherService {
    let settings = WeatherSettings {
        rss_base_url: format!("{base}/rss"),
        radar_base_url: format!("{base}/radars"),
        cache_ttl: Duration::from_secs(60),
    };
    let llm =
        LlmClient::new(format!("{base}/llm"), Some("key".into()), "vision", TIMEOUT).unwrap();
    let notifier = telegram.then(|| {
        let settings = TelegramSettings {
            bot_token: "T".into(),
            chat_id: "-1".into(),
            api_base_url: format!("{base}/tg"),
        };
        TelegramNotifier::new(&settings, TIMEOUT).unwrap()
    });
    WeatherService::new(
        HkoClient::new(&settings, TIMEOUT).unwrap(),
        settings.cache_ttl,
        llm,
        notifier,
        inline_image,
    )
}
