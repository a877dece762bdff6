use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::links::{ChatClient, ChatError};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Minimal Bot API client covering the two calls the tracker makes.
pub struct TelegramBotClient {
    client: Client,
    base_url: String,
    token: String,
}

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramBotClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: TELEGRAM_API_BASE.to_string(),
            token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Strips the bot token out of error text before it is logged or relayed.
    fn sanitize(&self, text: &str) -> String {
        text.replace(&self.token, "<redacted>")
    }

    async fn call(&self, method: &str, payload: Value) -> Result<(), ChatError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChatError::Http(self.sanitize(&e.to_string())))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::Http(self.sanitize(&e.to_string())))?;

        check_response(status.as_u16(), &text)
            .map_err(|description| ChatError::Api(format!("{}: {}", method, description)))
    }
}

/// Reads the `{ok, description}` envelope; the error is the API's description.
fn check_response(status: u16, body: &str) -> Result<(), String> {
    match serde_json::from_str::<ApiResponse>(body) {
        Ok(ApiResponse { ok: true, .. }) => Ok(()),
        Ok(ApiResponse { description, .. }) => {
            Err(description.unwrap_or_else(|| format!("request failed with status {}", status)))
        }
        Err(_) => Err(format!("unexpected response ({}): {}", status, body)),
    }
}

#[async_trait]
impl ChatClient for TelegramBotClient {
    async fn send_message(&self, chat_id: &str, html: &str) -> Result<(), ChatError> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": html,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
        )
        .await
    }

    async fn set_reaction(
        &self,
        chat_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<(), ChatError> {
        self.call(
            "setMessageReaction",
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "reaction": [{"type": "emoji", "emoji": emoji}],
            }),
        )
        .await
    }
}
