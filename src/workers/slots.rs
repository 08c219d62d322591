//! Keeps the delivery slot calendar materialized over the scheduling horizon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use diesel::ExpressionMethods;
use diesel_async::RunQueryDsl;
use tracing::info;

use crate::app_state::AppState;
use crate::domain::{geo, slots};
use crate::schema::delivery_slots;

const REFRESH_INTERVAL_SECS: u64 = 60 * 60;

pub async fn run(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(REFRESH_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        if let Err(err) = materialize_horizon(&state).await {
            tracing::error!("Slot calendar refresh failed: {err:?}");
        }
    }
}

/// Inserts any missing (date, window, zone) rows over the bookable horizon.
/// Rows that already exist keep their booked counts. Hourly so the window
/// that opens after the same-day cutoff is covered promptly.
async fn materialize_horizon(state: &Arc<AppState>) -> Result<()> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut rows = Vec::new();
    for date in slots::horizon_dates(slots::earliest_delivery_date(Utc::now())) {
        for window in slots::DELIVERY_WINDOWS {
            for zone in geo::ZONE_NAMES {
                rows.push((
                    delivery_slots::slot_date.eq(date),
                    delivery_slots::time_window.eq(window),
                    delivery_slots::zone.eq(zone),
                    delivery_slots::capacity.eq(slots::SLOT_CAPACITY),
                ));
            }
        }
    }

    let created = diesel::insert_into(delivery_slots::table)
        .values(&rows)
        .on_conflict((
            delivery_slots::slot_date,
            delivery_slots::time_window,
            delivery_slots::zone,
        ))
        .do_nothing()
        .execute(conn)
        .await
        .context("Failed to materialize delivery slots")?;

    if created > 0 {
        info!("Materialized {created} delivery slots");
    }
    Ok(())
}
