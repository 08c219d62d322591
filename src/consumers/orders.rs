use std::sync::Arc;

use anyhow::Result;
use diesel::ExpressionMethods;
use diesel_async::RunQueryDsl;
use futures::future::BoxFuture;
use tracing::info;

use crate::{
    app_state::AppState,
    domain::loyalty,
    events::{
        DeliveryReminderEvent, DeliveryScheduledEvent, OrderCancelledEvent, OrderCreatedEvent,
        OrderDeliveredEvent, OrderPaidEvent,
    },
    models::OutboxEntity,
    notify::{self, NotificationKind, TemplateArgs},
    schema::{order_analytics, users},
};

pub fn order_created(entry: OutboxEntity, state: Arc<AppState>) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let payload: OrderCreatedEvent = serde_json::from_str(&entry.payload)?;
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
            NotificationKind::OrderCreated,
            &TemplateArgs {
                order_number: payload.order_number.clone(),
                total_amount: payload.total_amount,
                ..TemplateArgs::default()
            },
        )
        .await?;

        info!("Order #{} has been recorded", payload.order_id);

        Ok(())
    })
}

pub fn order_paid(entry: OutboxEntity, state: Arc<AppState>) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let payload: OrderPaidEvent = serde_json::from_str(&entry.payload)?;
        info!("Received event: {:?}", payload);

        notify::send(
            &state,
            payload.user_id,
            NotificationKind::OrderPaid,
            &TemplateArgs {
                order_number: payload.order_number.clone(),
                total_amount: payload.amount,
                ..TemplateArgs::default()
            },
        )
        .await?;

        info!("Payment for order #{} has been settled", payload.order_id);

        Ok(())
    })
}

pub fn delivery_scheduled(
    entry: OutboxEntity,
    state: Arc<AppState>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let payload: DeliveryScheduledEvent = serde_json::from_str(&entry.payload)?;
        info!("Received event: {:?}", payload);

        notify::send(
            &state,
            payload.user_id,
            NotificationKind::DeliveryScheduled,
            &TemplateArgs {
                order_number: payload.order_number.clone(),
                scheduled_date: Some(payload.scheduled_date),
                scheduled_window: Some(payload.scheduled_window.clone()),
                ..TemplateArgs::default()
            },
        )
        .await?;

        info!(
            "Delivery #{} for order #{} has been announced",
            payload.delivery_id, payload.order_id
        );

        Ok(())
    })
}

pub fn order_delivered(
    entry: OutboxEntity,
    state: Arc<AppState>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let payload: OrderDeliveredEvent = serde_json::from_str(&entry.payload)?;
        info!("Received event: {:?}", payload);

        let conn = &mut state.db_pool.get().await?;

        let points_earned = loyalty::points_earned(payload.total_amount);
        if points_earned > 0 {
            diesel::update(users::table)
                .filter(users::id.eq(payload.user_id))
                .set(users::loyalty_points.eq(users::loyalty_points + points_earned))
                .execute(conn)
                .await?;
        }

        diesel::insert_into(order_analytics::table)
            .values((
                order_analytics::day.eq(payload.delivered_on),
                order_analytics::orders_delivered.eq(1),
                order_analytics::revenue.eq(payload.total_amount),
            ))
            .on_conflict(order_analytics::day)
            .do_update()
            .set((
                order_analytics::orders_delivered.eq(order_analytics::orders_delivered + 1),
                order_analytics::revenue.eq(order_analytics::revenue + payload.total_amount),
            ))
            .execute(conn)
            .await?;

        notify::send(
            &state,
            payload.user_id,
            NotificationKind::OrderDelivered,
            &TemplateArgs {
                order_number: payload.order_number.clone(),
                points_earned,
                ..TemplateArgs::default()
            },
        )
        .await?;

        info!(
            "Order #{} delivered, {} loyalty points awarded",
            payload.order_id, points_earned
        );

        Ok(())
    })
}

pub fn order_cancelled(
    entry: OutboxEntity,
    state: Arc<AppState>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let payload: OrderCancelledEvent = serde_json::from_str(&entry.payload)?;
        info!("Received event: {:?}", payload);

        notify::send(
            &state,
            payload.user_id,
            NotificationKind::OrderCancelled,
            &TemplateArgs {
                order_number: payload.order_number.clone(),
                ..TemplateArgs::default()
            },
        )
        .await?;

        info!("Order #{} has been cancelled", payload.order_id);

        Ok(())
    })
}

pub fn delivery_reminder(
    entry: OutboxEntity,
    state: Arc<AppState>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let payload: DeliveryReminderEvent = serde_json::from_str(&entry.payload)?;
        info!("Received event: {:?}", payload);

        notify::send(
            &state,
            payload.user_id,
            NotificationKind::DeliveryReminder,
            &TemplateArgs {
                order_number: payload.order_number.clone(),
                scheduled_date: Some(payload.scheduled_date),
                scheduled_window: Some(payload.scheduled_window.clone()),
                ..TemplateArgs::default()
            },
        )
        .await?;

        info!(
            "Reminder for delivery #{} has been sent",
            payload.delivery_id
        );

        Ok(())
    })
}
