//! Transactional outbox. Route handlers publish events inside their own
//! database transaction; a background dispatcher polls committed entries and
//! routes them to the consumers registered at bootstrap.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use futures::future::BoxFuture;
use serde::Serialize;

use crate::{app_state::AppState, models::OutboxEntity, schema::outbox};

/// Consumer signature: receives the committed outbox entry and shared state.
pub type EventConsumer = fn(OutboxEntity, Arc<AppState>) -> BoxFuture<'static, Result<()>>;

const POLL_INTERVAL_SECS: u64 = 2;
const DISPATCH_BATCH: i64 = 32;

/// Writes an event into the outbox. Must be called on the transaction
/// connection of the state change that produced the event, so that both
/// commit or roll back together.
pub async fn publish<E: Serialize>(
    conn: &mut AsyncPgConnection,
    event_type: String,
    event: E,
) -> Result<()> {
    let payload = serde_json::to_string(&event).context("Failed to serialize event payload")?;
    diesel::insert_into(outbox::table)
        .values((
            outbox::event_type.eq(event_type),
            outbox::payload.eq(payload),
        ))
        .execute(conn)
        .await
        .context("Failed to insert outbox entry")?;
    Ok(())
}

/// Polls the outbox forever, dispatching committed entries to consumers.
/// Entries whose consumer fails are parked as `error` and logged; entries
/// left `processing` by a crash are requeued on startup.
pub async fn run_dispatcher(state: Arc<AppState>, consumers: Vec<(String, EventConsumer)>) {
    if let Err(err) = requeue_stalled(&state).await {
        tracing::error!("Failed to requeue stalled outbox entries: {err:?}");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        if let Err(err) = dispatch_batch(&state, &consumers).await {
            tracing::error!("Outbox dispatch pass failed: {err:?}");
        }
    }
}

async fn requeue_stalled(state: &Arc<AppState>) -> Result<()> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let requeued = diesel::update(outbox::table.filter(outbox::status.eq("processing")))
        .set(outbox::status.eq("pending"))
        .execute(conn)
        .await
        .context("Failed to requeue stalled outbox entries")?;
    if requeued > 0 {
        tracing::warn!("Requeued {requeued} outbox entries left over from a previous run");
    }
    Ok(())
}

async fn dispatch_batch(
    state: &Arc<AppState>,
    consumers: &[(String, EventConsumer)],
) -> Result<()> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let pending: Vec<OutboxEntity> = outbox::table
        .filter(outbox::status.eq("pending"))
        .order_by(outbox::id.asc())
        .limit(DISPATCH_BATCH)
        .get_results(conn)
        .await
        .context("Failed to fetch pending outbox entries")?;

    for entry in pending {
        let entry_id = entry.id;
        let consumer = consumers
            .iter()
            .find(|(topic, _)| *topic == entry.event_type)
            .map(|(_, consumer)| *consumer);

        let Some(consumer) = consumer else {
            tracing::warn!("No consumer registered for topic {}", entry.event_type);
            set_status(conn, entry_id, "error").await?;
            continue;
        };

        set_status(conn, entry_id, "processing").await?;
        match consumer(entry, state.clone()).await {
            Ok(()) => set_status(conn, entry_id, "done").await?,
            Err(err) => {
                tracing::error!("Consumer for outbox entry #{entry_id} failed: {err:?}");
                set_status(conn, entry_id, "error").await?;
            }
        }
    }

    Ok(())
}

async fn set_status(conn: &mut AsyncPgConnection, id: i32, status: &str) -> Result<()> {
    diesel::update(outbox::table.find(id))
        .set(outbox::status.eq(status))
        .execute(conn)
        .await
        .context("Failed to update outbox entry status")?;
    Ok(())
}
