//! Turns due subscriptions into real orders.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::{info, warn};

use crate::aliases::DieselError;
use crate::app_state::AppState;
use crate::domain::{geo, orders as pricing, status::OrderStatus};
use crate::events::SubscriptionRenewedEvent;
use crate::models::{
    AddressEntity, CreateOrderEntity, CreateOrderItemEntity, OrderEntity, ProductEntity,
    SubscriptionEntity, UserEntity,
};
use crate::outbox;
use crate::schema::{addresses, company_info, order_items, orders, products, subscriptions, users};

const CHECK_INTERVAL_SECS: u64 = 60 * 60;

enum RenewalOutcome {
    Placed { order_number: String },
    Postponed,
}

pub async fn run(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(StdDuration::from_secs(CHECK_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        if let Err(err) = renew_due_subscriptions(&state).await {
            tracing::error!("Subscription renewal pass failed: {err:?}");
        }
    }
}

async fn renew_due_subscriptions(state: &Arc<AppState>) -> Result<()> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let due: Vec<SubscriptionEntity> = subscriptions::table
        .filter(subscriptions::status.eq("active"))
        .filter(subscriptions::next_delivery_date.le(Utc::now().date_naive()))
        .order_by(subscriptions::next_delivery_date.asc())
        .load(conn)
        .await
        .context("Failed to load due subscriptions")?;

    for sub in due {
        let sub_id = sub.id;
        match renew_one(conn, sub).await {
            Ok(RenewalOutcome::Placed { order_number }) => {
                info!("Renewed subscription #{sub_id} with order {order_number}");
            }
            Ok(RenewalOutcome::Postponed) => {
                warn!("Postponed subscription #{sub_id}: product is out of stock");
            }
            Err(err) => {
                tracing::error!("Renewal of subscription #{sub_id} failed: {err:?}");
            }
        }
    }
    Ok(())
}

/// Places the renewal order, advances the subscription and emits
/// `subscriptions.renewed` in one transaction. A product without stock
/// pushes `next_delivery_date` to tomorrow instead.
async fn renew_one(
    conn: &mut AsyncPgConnection,
    sub: SubscriptionEntity,
) -> Result<RenewalOutcome> {
    let today = Utc::now().date_naive();

    conn.transaction(move |conn| {
        Box::pin(async move {
            let reserved = diesel::update(
                products::table
                    .find(sub.product_id)
                    .filter(products::is_active.eq(true))
                    .filter(products::stock_quantity.ge(sub.quantity)),
            )
            .set(products::stock_quantity.eq(products::stock_quantity - sub.quantity))
            .returning(ProductEntity::as_returning())
            .get_result(conn)
            .await;

            let product: ProductEntity = match reserved {
                Ok(product) => product,
                Err(DieselError::NotFound) => {
                    diesel::update(subscriptions::table.find(sub.id))
                        .set(subscriptions::next_delivery_date.eq(today + Duration::days(1)))
                        .execute(conn)
                        .await
                        .context("Failed to postpone subscription")?;
                    return Ok(RenewalOutcome::Postponed);
                }
                Err(err) => return Err(err).context("Failed to reserve subscription stock"),
            };

            let address: AddressEntity = addresses::table
                .find(sub.address_id)
                .get_result(conn)
                .await
                .context("Subscription address is missing")?;

            let warehouse: (f64, f64) = company_info::table
                .select((
                    company_info::warehouse_latitude,
                    company_info::warehouse_longitude,
                ))
                .first(conn)
                .await
                .context("Company record is missing")?;

            let (delivery_fee, _zone) =
                geo::delivery_fee(warehouse, address.latitude.zip(address.longitude))?;

            let user: UserEntity = users::table
                .find(sub.user_id)
                .get_result(conn)
                .await
                .context("Failed to get user")?;

            let subtotal = product.price * f64::from(sub.quantity);
            // Renewals never spend loyalty points.
            let breakdown = pricing::price_order(subtotal, delivery_fee, user.is_vip, true, 0, 0);

            let order: OrderEntity = diesel::insert_into(orders::table)
                .values(CreateOrderEntity {
                    user_id: sub.user_id,
                    order_number: pricing::generate_order_number(today),
                    status: OrderStatus::Confirmed.as_str().into(),
                    subtotal: breakdown.subtotal,
                    delivery_fee: breakdown.delivery_fee,
                    discount_amount: breakdown.discount_amount,
                    loyalty_points_used: breakdown.loyalty_points_used,
                    total_amount: breakdown.total_amount,
                    special_instructions: None,
                    delivery_address_id: sub.address_id,
                    subscription_id: Some(sub.id),
                })
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await
                .context("Failed to create renewal order")?;

            diesel::insert_into(order_items::table)
                .values(CreateOrderItemEntity {
                    order_id: order.id,
                    product_id: sub.product_id,
                    quantity: sub.quantity,
                    unit_price: product.price,
                    total_price: subtotal,
                })
                .execute(conn)
                .await
                .context("Failed to create renewal order item")?;

            // Overdue subscriptions advance from today, so a long gap yields
            // one order rather than a backlog.
            let next = today + Duration::days(i64::from(sub.frequency_days));
            let advanced = diesel::update(
                subscriptions::table
                    .find(sub.id)
                    .filter(subscriptions::status.eq("active"))
                    .filter(subscriptions::next_delivery_date.eq(sub.next_delivery_date)),
            )
            .set((
                subscriptions::next_delivery_date.eq(next),
                subscriptions::total_deliveries.eq(subscriptions::total_deliveries + 1),
            ))
            .execute(conn)
            .await
            .context("Failed to advance subscription")?;
            if advanced == 0 {
                return Err(anyhow!("Subscription #{} changed while renewing", sub.id));
            }

            outbox::publish(
                conn,
                "subscriptions.renewed".to_string(),
                SubscriptionRenewedEvent {
                    subscription_id: sub.id,
                    user_id: sub.user_id,
                    order_id: order.id,
                    order_number: order.order_number.clone(),
                    placed_on: today,
                    next_delivery_date: next,
                },
            )
            .await?;

            Ok::<RenewalOutcome, anyhow::Error>(RenewalOutcome::Placed {
                order_number: order.order_number,
            })
        })
    })
    .await
}
