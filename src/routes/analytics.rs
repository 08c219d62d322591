use anyhow::Context;
use axum::{Extension, extract::State, response::IntoResponse};
use chrono::{Datelike, Duration, Utc};
use diesel::dsl::{avg, count_distinct, count_star, sum};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::OrderAnalyticsEntity,
    schema::{order_analytics, order_items, orders, products, users},
};

/// Defines analytics routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let authed = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_my_stats))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::user_authorization,
        ));

    let admin = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_overview))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/analytics", authed.merge(admin))
}

#[derive(Serialize, ToSchema)]
struct TopProductRes {
    product_id: i32,
    name: String,
    quantity: i64,
}

#[derive(Serialize, ToSchema)]
struct CustomerStatsRes {
    total_orders: i64,
    total_spent: f64,
    average_order: f64,
    orders_last_7_days: i64,
    orders_last_30_days: i64,
    loyalty_points: i32,
    top_products: Vec<TopProductRes>,
}

/// Fetch the authenticated user's ordering profile. Cancelled orders do
/// not count.
#[utoipa::path(
    get,
    path = "/me",
    tags = ["Analytics"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get my stats successfully", body = StdResponse<CustomerStatsRes, String>)
    )
)]
async fn get_my_stats(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (total_orders, total_spent, average_order): (i64, Option<f64>, Option<f64>) =
        orders::table
            .filter(orders::user_id.eq(user_id))
            .filter(orders::status.ne("cancelled"))
            .select((
                count_star(),
                sum(orders::total_amount),
                avg(orders::total_amount),
            ))
            .get_result(conn)
            .await
            .context("Failed to aggregate orders")?;

    let now = Utc::now();
    let orders_last_7_days: i64 = orders::table
        .filter(orders::user_id.eq(user_id))
        .filter(orders::status.ne("cancelled"))
        .filter(orders::created_at.ge(now - Duration::days(7)))
        .count()
        .get_result(conn)
        .await
        .context("Failed to count recent orders")?;
    let orders_last_30_days: i64 = orders::table
        .filter(orders::user_id.eq(user_id))
        .filter(orders::status.ne("cancelled"))
        .filter(orders::created_at.ge(now - Duration::days(30)))
        .count()
        .get_result(conn)
        .await
        .context("Failed to count recent orders")?;

    let loyalty_points: i32 = users::table
        .find(user_id)
        .select(users::loyalty_points)
        .get_result(conn)
        .await
        .context("Failed to get loyalty balance")?;

    let top: Vec<(i32, String, Option<i64>)> = order_items::table
        .inner_join(orders::table)
        .inner_join(products::table)
        .filter(orders::user_id.eq(user_id))
        .filter(orders::status.ne("cancelled"))
        .group_by((order_items::product_id, products::name))
        .select((
            order_items::product_id,
            products::name,
            sum(order_items::quantity),
        ))
        .order_by(sum(order_items::quantity).desc())
        .limit(3)
        .get_results(conn)
        .await
        .context("Failed to rank products")?;

    Ok(StdResponse {
        data: Some(CustomerStatsRes {
            total_orders,
            total_spent: total_spent.unwrap_or(0.0),
            average_order: average_order.unwrap_or(0.0),
            orders_last_7_days,
            orders_last_30_days,
            loyalty_points,
            top_products: top
                .into_iter()
                .map(|(product_id, name, quantity)| TopProductRes {
                    product_id,
                    name,
                    quantity: quantity.unwrap_or(0),
                })
                .collect(),
        }),
        message: Some("Get my stats successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct DailySnapshot {
    orders_placed: i32,
    orders_delivered: i32,
    revenue: f64,
}

#[derive(Serialize, ToSchema)]
struct MonthSnapshot {
    orders_placed: i64,
    orders_delivered: i64,
    revenue: f64,
}

#[derive(Serialize, ToSchema)]
struct AdminOverviewRes {
    today: DailySnapshot,
    month: MonthSnapshot,
    pending_orders: i64,
    active_customers_30d: i64,
    top_products: Vec<TopProductRes>,
}

/// Fetch the business dashboard: today and month-to-date from the daily
/// rollup, plus live queue and customer numbers.
#[utoipa::path(
    get,
    path = "/overview",
    tags = ["Analytics"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get overview successfully", body = StdResponse<AdminOverviewRes, String>)
    )
)]
async fn get_overview(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let today = Utc::now().date_naive();
    let today_row: Option<OrderAnalyticsEntity> = order_analytics::table
        .find(today)
        .get_result(conn)
        .await
        .optional()
        .context("Failed to get today's rollup")?;
    let today_snapshot = match today_row {
        Some(row) => DailySnapshot {
            orders_placed: row.orders_placed,
            orders_delivered: row.orders_delivered,
            revenue: row.revenue,
        },
        None => DailySnapshot {
            orders_placed: 0,
            orders_delivered: 0,
            revenue: 0.0,
        },
    };

    let month_start = today.with_day(1).unwrap_or(today);
    let month_rows: Vec<OrderAnalyticsEntity> = order_analytics::table
        .filter(order_analytics::day.ge(month_start))
        .filter(order_analytics::day.le(today))
        .get_results(conn)
        .await
        .context("Failed to get month rollup")?;
    let month_snapshot = MonthSnapshot {
        orders_placed: month_rows.iter().map(|row| i64::from(row.orders_placed)).sum(),
        orders_delivered: month_rows
            .iter()
            .map(|row| i64::from(row.orders_delivered))
            .sum(),
        revenue: month_rows.iter().map(|row| row.revenue).sum(),
    };

    let pending_orders: i64 = orders::table
        .filter(orders::status.eq("pending"))
        .count()
        .get_result(conn)
        .await
        .context("Failed to count pending orders")?;

    let active_customers_30d: i64 = orders::table
        .filter(orders::created_at.ge(Utc::now() - Duration::days(30)))
        .select(count_distinct(orders::user_id))
        .get_result(conn)
        .await
        .context("Failed to count active customers")?;

    let top: Vec<(i32, String, Option<i64>)> = order_items::table
        .inner_join(orders::table)
        .inner_join(products::table)
        .filter(orders::status.ne("cancelled"))
        .filter(orders::created_at.ge(Utc::now() - Duration::days(30)))
        .group_by((order_items::product_id, products::name))
        .select((
            order_items::product_id,
            products::name,
            sum(order_items::quantity),
        ))
        .order_by(sum(order_items::quantity).desc())
        .limit(3)
        .get_results(conn)
        .await
        .context("Failed to rank products")?;

    Ok(StdResponse {
        data: Some(AdminOverviewRes {
            today: today_snapshot,
            month: month_snapshot,
            pending_orders,
            active_customers_30d,
            top_products: top
                .into_iter()
                .map(|(product_id, name, quantity)| TopProductRes {
                    product_id,
                    name,
                    quantity: quantity.unwrap_or(0),
                })
                .collect(),
        }),
        message: Some("Get overview successfully"),
    })
}
