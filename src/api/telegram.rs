use anyhow::Result;
use reqwest::Client;
use serde::Serialize;

use crate::{app_error::AppError, config::TelegramConfig};

#[derive(Serialize)]
struct SendMessageReq<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Sends a plain text message through the Telegram Bot API.
pub async fn send_message(
    client: Client,
    config: &TelegramConfig,
    chat_id: i64,
    text: &str,
) -> Result<()> {
    let Some(token) = config.bot_token.as_deref() else {
        tracing::debug!("BOT_TOKEN is not set, skipping Telegram message to {chat_id}");
        return Ok(());
    };

    let response = client
        .post(format!("{}/bot{}/sendMessage", config.api_url, token))
        .json(&SendMessageReq { chat_id, text })
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("Telegram".into()))?;

    if !response.status().is_success() {
        anyhow::bail!("Telegram API responded with {}", response.status());
    }
    Ok(())
}
