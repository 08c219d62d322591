use anyhow::Result;
use reqwest::Client;
use serde::Serialize;

use crate::{app_error::AppError, config::EmailConfig};

#[derive(Serialize)]
struct SendEmailReq<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts a message to the configured transactional email relay.
pub async fn send_email(
    client: Client,
    config: &EmailConfig,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<()> {
    let Some(api_url) = config.api_url.as_deref() else {
        tracing::debug!("EMAIL_API_URL is not set, skipping email to {to}");
        return Ok(());
    };

    let mut request = client.post(api_url).json(&SendEmailReq {
        to,
        from: &config.from,
        subject,
        body,
    });
    if let Some(token) = config.api_token.as_deref() {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("Email relay".into()))?;

    if !response.status().is_success() {
        anyhow::bail!("Email relay responded with {}", response.status());
    }
    Ok(())
}
