pub mod templates;

use std::sync::Arc;

use anyhow::{Context, Result};
use diesel::{OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;

pub use templates::{NotificationKind, TemplateArgs};

use crate::{
    api,
    app_state::AppState,
    models::{CreateNotificationEntity, UserEntity, UserPreferencesEntity},
    schema::{notifications, user_preferences, users},
};

/// Renders the template in the customer's language, stores an in-app
/// notification row and pushes the message through every channel the
/// customer opted into. Channel failures are logged, never fatal.
pub async fn send(
    state: &Arc<AppState>,
    user_id: i32,
    kind: NotificationKind,
    args: &TemplateArgs,
) -> Result<()> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = users::table
        .find(user_id)
        .get_result(conn)
        .await
        .context("Failed to load notification target")?;

    let prefs: Option<UserPreferencesEntity> = user_preferences::table
        .find(user_id)
        .get_result(conn)
        .await
        .optional()
        .context("Failed to load notification preferences")?;

    let message = templates::render(kind, &user.language_code, args);

    diesel::insert_into(notifications::table)
        .values(CreateNotificationEntity {
            user_id,
            kind: kind.as_str().to_string(),
            title: message.title.clone(),
            message: message.body.clone(),
        })
        .execute(conn)
        .await
        .context("Failed to store notification")?;

    // Missing preference row means the defaults: telegram on, the rest off.
    let (telegram_on, sms_on, email_on) = prefs
        .map(|p| (p.notify_telegram, p.notify_sms, p.notify_email))
        .unwrap_or((true, false, false));

    if telegram_on {
        if let Err(err) = api::telegram::send_message(
            state.http_client.clone(),
            &state.config.telegram,
            user.telegram_id,
            &message.body,
        )
        .await
        {
            tracing::warn!("Telegram notification to user #{user_id} failed: {err:?}");
        }
    }

    if sms_on {
        if let Some(phone) = user.phone.as_deref() {
            if let Err(err) = api::sms::send_sms(
                state.http_client.clone(),
                &state.config.sms,
                phone,
                &message.body,
            )
            .await
            {
                tracing::warn!("SMS notification to user #{user_id} failed: {err:?}");
            }
        }
    }

    if email_on {
        if let Some(email) = user.email.as_deref() {
            if let Err(err) = api::email::send_email(
                state.http_client.clone(),
                &state.config.email,
                email,
                &message.title,
                &message.body,
            )
            .await
            {
                tracing::warn!("Email notification to user #{user_id} failed: {err:?}");
            }
        }
    }

    Ok(())
}
