use anyhow::Result;
use reqwest::Client;
use serde::Serialize;

use crate::{app_error::AppError, config::SmsConfig};

#[derive(Serialize)]
struct SendSmsReq<'a> {
    to: &'a str,
    from: &'a str,
    text: &'a str,
}

/// Posts a message to the configured SMS gateway.
pub async fn send_sms(client: Client, config: &SmsConfig, phone: &str, text: &str) -> Result<()> {
    let Some(api_url) = config.api_url.as_deref() else {
        tracing::debug!("SMS_API_URL is not set, skipping SMS to {phone}");
        return Ok(());
    };

    let mut request = client.post(api_url).json(&SendSmsReq {
        to: phone,
        from: &config.sender,
        text,
    });
    if let Some(token) = config.api_token.as_deref() {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("SMS gateway".into()))?;

    if !response.status().is_success() {
        anyhow::bail!("SMS gateway responded with {}", response.status());
    }
    Ok(())
}
