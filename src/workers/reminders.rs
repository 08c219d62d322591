//! Sends day-before reminders for scheduled deliveries.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::info;

use crate::app_state::AppState;
use crate::events::DeliveryReminderEvent;
use crate::models::{DeliveryEntity, OrderEntity};
use crate::outbox;
use crate::schema::{deliveries, orders};

const CHECK_INTERVAL_SECS: u64 = 60 * 60;

pub async fn run(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(StdDuration::from_secs(CHECK_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        if let Err(err) = remind_tomorrows_deliveries(&state).await {
            tracing::error!("Delivery reminder pass failed: {err:?}");
        }
    }
}

async fn remind_tomorrows_deliveries(state: &Arc<AppState>) -> Result<()> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let tomorrow = Utc::now().date_naive() + Duration::days(1);
    let due: Vec<(DeliveryEntity, OrderEntity)> = deliveries::table
        .inner_join(orders::table)
        .filter(deliveries::scheduled_date.eq(tomorrow))
        .filter(deliveries::status.eq("scheduled"))
        .filter(deliveries::reminder_sent_at.is_null())
        .select((DeliveryEntity::as_select(), OrderEntity::as_select()))
        .load(conn)
        .await
        .context("Failed to load deliveries due a reminder")?;

    let mut reminded = 0;
    for (delivery, order) in due {
        let marked = conn.transaction(|conn| {
            Box::pin(async move {
                // The null check keeps a concurrent pass from reminding twice.
                let marked = diesel::update(
                    deliveries::table
                        .find(delivery.id)
                        .filter(deliveries::reminder_sent_at.is_null()),
                )
                .set(deliveries::reminder_sent_at.eq(Utc::now()))
                .execute(conn)
                .await?;

                if marked > 0 {
                    outbox::publish(
                        conn,
                        "orders.delivery_reminder".to_string(),
                        DeliveryReminderEvent {
                            delivery_id: delivery.id,
                            order_id: order.id,
                            user_id: order.user_id,
                            order_number: order.order_number.clone(),
                            scheduled_date: delivery.scheduled_date,
                            scheduled_window: delivery.scheduled_window.clone(),
                        },
                    )
                    .await?;
                }
                Ok::<usize, anyhow::Error>(marked)
            })
        })
        .await
        .context("Reminder transaction failed")?;
        reminded += marked;
    }

    if reminded > 0 {
        info!("Queued reminders for {reminded} deliveries scheduled on {tomorrow}");
    }
    Ok(())
}
