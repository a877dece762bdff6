// This is the entry point of the link tracker bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic): the metadata codec, the row
//   allocator and the dispatch flow
// - `infra/` = Implementations of core traits (Telegram Bot API, Google Sheets)
// - `webhook/` = The HTTP endpoint Telegram posts updates to
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize clients and the link service (dependency injection)
// 3. Serve the webhook

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "webhook/webhook_layer.rs"]
mod webhook;

mod config;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::core::links::LinkService;
use crate::infra::google_sheets::{GoogleSheetsClient, ServiceAccountAuth};
use crate::infra::telegram::TelegramBotClient;
use crate::webhook::WebhookState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let auth = ServiceAccountAuth::from_env()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load service account: {}", e))?;
    tracing::info!(client_email = auth.client_email(), "Loaded Google service account");

    let sheets = GoogleSheetsClient::new(
        auth,
        config.spreadsheet_id.clone(),
        config.sheet_name.clone(),
    );

    let service = match config.bot_token.clone() {
        Some(token) => Some(LinkService::new(
            TelegramBotClient::new(token),
            sheets,
            config.tracker_settings(),
        )),
        None => {
            tracing::warn!("BOT_TOKEN is not set; updates will be answered with a 500");
            None
        }
    };

    // ========================================================================
    // WEBHOOK SERVER
    // ========================================================================

    let app = webhook::router(WebhookState { service }, &config.webhook_path);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind webhook server to {}", config.bind_addr))?;

    tracing::info!(
        addr = %config.bind_addr,
        path = %config.webhook_path,
        sheet = %config.sheet_name,
        "Link tracker webhook listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
