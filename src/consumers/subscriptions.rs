use std::sync::Arc;

use anyhow::Result;
use diesel::ExpressionMethods;
use diesel_async::RunQueryDsl;
use futures::future::BoxFuture;
use tracing::info;

use crate::{
    app_state::AppState,
    events::SubscriptionRenewedEvent,
    models::OutboxEntity,
    notify::{self, NotificationKind, TemplateArgs},
    schema::order_analytics,
};

pub fn subscription_renewed(
    entry: OutboxEntity,
    state: Arc<AppState>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let payload: SubscriptionRenewedEvent = serde_json::from_str(&entry.payload)?;
        info!("Received event: {:?}", payload);

        let conn = &mut state.db_pool.get().await?;
        diesel::insert_into(order_analytics::table)
            .values((
                order_analytics::day.eq(payload.placed_on),
                order_analytics::orders_placed.eq(1),
            ))
            .on_conflict(order_analytics::day)
            .do_update()
            .set(order_analytics::orders_placed.eq(order_analytics::orders_placed + 1))
            .execute(conn)
            .await?;

        notify::send(
            &state,
            payload.user_id,
            NotificationKind::SubscriptionRenewed,
            &TemplateArgs {
                order_number: payload.order_number.clone(),
                next_delivery_date: Some(payload.next_delivery_date),
                ..TemplateArgs::default()
            },
        )
        .await?;

        info!(
            "Subscription #{} renewed as order #{}",
            payload.subscription_id, payload.order_id
        );

        Ok(())
    })
}
