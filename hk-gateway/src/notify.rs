//! Telegram bot notifications.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::TelegramSettings;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends photos and messages to one chat.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(settings: &TelegramSettings, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: format!(
                "{}/bot{}",
                settings.api_base_url.trim_end_matches('/'),
                settings.bot_token
            ),
            chat_id: settings.chat_id.clone(),
        })
    }

    /// Upload a JPEG with a caption.
    pub async fn send_photo(&self, jpeg: Vec<u8>, caption: &str) -> Result<(), NotifyError> {
        let photo = Part::bytes(jpeg)
            .file_name("radar.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("photo", photo)
            .text("caption", caption.to_string());

        let response = self
            .http
            .post(format!("{}/sendPhoto", self.api_base))
            .multipart(form)
            .send()
            .await?;
        check(response).await
    }

    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(format!("{}/sendMessage", self.api_base))
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await?;
        check(response).await
    }
}

async fn check(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    let body = response.text().await?;
    let parsed: Option<TelegramResponse> = serde_json::from_str(&body).ok();

    match parsed {
        Some(r) if status.is_success() && r.ok => Ok(()),
        Some(r) => Err(NotifyError::Api {
            status: status.as_u16(),
            message: r.description.unwrap_or(body),
        }),
        None if status.is_success() => Ok(()),
        None => Err(NotifyError::Api {
            status: status.as_u16(),
            message: body,
        }),
    }
}
