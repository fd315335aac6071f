//! Telegram Bot API delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AppError, Result};
use crate::models::TelegramConfig;
use crate::notify::{CAPTION_LIMIT, DeliveryChannel, MESSAGE_LIMIT, OutboundMessage};
use crate::utils::truncate_graphemes;

const PARSE_MODE: &str = "HTML";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Serialize)]
struct SendPhoto<'a> {
    chat_id: &'a str,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages through `sendMessage`, or `sendPhoto` for messages with
/// media whose text fits into a caption.
pub struct TelegramChannel {
    client: Client,
    api_base: String,
    token: String,
    disable_preview: bool,
}

impl TelegramChannel {
    pub fn new(client: Client, config: &TelegramConfig) -> Result<Self> {
        let token = config
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::config("telegram bot token is not set"))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            disable_preview: config.disable_preview,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T: Serialize>(&self, recipient_id: &str, method: &str, body: &T) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::delivery(recipient_id, e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::delivery(recipient_id, e.without_url()))?;
        let parsed: Option<ApiResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.description)
                .unwrap_or_else(|| truncate_graphemes(&text, 200));
            return Err(AppError::delivery(
                recipient_id,
                format!("HTTP {status}: {detail}"),
            ));
        }
        match parsed {
            Some(ApiResponse { ok: true, .. }) => Ok(()),
            Some(ApiResponse { description, .. }) => Err(AppError::delivery(
                recipient_id,
                description.unwrap_or_else(|| "request rejected".to_string()),
            )),
            None => Err(AppError::delivery(recipient_id, "unreadable API response")),
        }
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    async fn send(&self, recipient_id: &str, message: &OutboundMessage) -> Result<()> {
        if let Some(photo) = &message.media {
            if message.text.graphemes(true).count() <= CAPTION_LIMIT {
                log::debug!("sendPhoto to {recipient_id}");
                let body = SendPhoto {
                    chat_id: recipient_id,
                    photo,
                    caption: &message.text,
                    parse_mode: PARSE_MODE,
                };
                return self.call(recipient_id, "sendPhoto", &body).await;
            }
        }

        let text = truncate_graphemes(&message.text, MESSAGE_LIMIT);
        log::debug!("sendMessage to {recipient_id}");
        let body = SendMessage {
            chat_id: recipient_id,
            text: &text,
            parse_mode: PARSE_MODE,
            disable_web_page_preview: self.disable_preview,
        };
        self.call(recipient_id, "sendMessage", &body).await
    }
}
