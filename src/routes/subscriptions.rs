use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::status::SubscriptionStatus,
    middleware,
    models::{CreateSubscriptionEntity, SubscriptionEntity},
    schema::{addresses, products, subscriptions},
};

/// Renewal cadence bounds, in days.
const MIN_FREQUENCY_DAYS: i32 = 1;
const MAX_FREQUENCY_DAYS: i32 = 90;

/// Defines subscription routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let authed = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_subscription))
        .routes(utoipa_axum::routes!(get_my_subscriptions))
        .routes(utoipa_axum::routes!(get_subscription))
        .routes(utoipa_axum::routes!(pause_subscription))
        .routes(utoipa_axum::routes!(resume_subscription))
        .routes(utoipa_axum::routes!(cancel_subscription))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::user_authorization,
        ));

    OpenApiRouter::new().nest("/subscriptions", authed)
}

#[derive(Deserialize, ToSchema)]
struct CreateSubscriptionReq {
    product_id: i32,
    address_id: i32,
    quantity: i32,
    frequency_days: i32,
}

/// Start a recurring water delivery. The first renewal order is generated
/// one cadence from today.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Subscriptions"],
    security(("bearerAuth" = [])),
    request_body = CreateSubscriptionReq,
    responses(
        (status = 200, description = "Created subscription successfully", body = StdResponse<SubscriptionEntity, String>)
    )
)]
async fn create_subscription(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<CreateSubscriptionReq>,
) -> Result<impl IntoResponse, AppError> {
    if !(MIN_FREQUENCY_DAYS..=MAX_FREQUENCY_DAYS).contains(&body.frequency_days) {
        return Err(AppError::BadRequest(format!(
            "Frequency must be between {MIN_FREQUENCY_DAYS} and {MAX_FREQUENCY_DAYS} days"
        )));
    }
    if body.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    products::table
        .find(body.product_id)
        .filter(products::is_active.eq(true))
        .select(products::id)
        .get_result::<i32>(conn)
        .await
        .map_err(|_| AppError::BadRequest("Product is not available for subscription".into()))?;

    addresses::table
        .find(body.address_id)
        .filter(addresses::user_id.eq(user_id))
        .select(addresses::id)
        .get_result::<i32>(conn)
        .await
        .map_err(|_| AppError::ForbiddenResource("User does not own this address".into()))?;

    let next_delivery_date = Utc::now().date_naive() + Duration::days(body.frequency_days.into());
    let subscription: SubscriptionEntity = diesel::insert_into(subscriptions::table)
        .values(CreateSubscriptionEntity {
            user_id,
            product_id: body.product_id,
            address_id: body.address_id,
            quantity: body.quantity,
            frequency_days: body.frequency_days,
            next_delivery_date,
            status: SubscriptionStatus::Active.as_str().into(),
        })
        .returning(SubscriptionEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create subscription")?;

    Ok(StdResponse {
        data: Some(subscription),
        message: Some("Created subscription successfully"),
    })
}

/// Fetch all subscriptions belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Subscriptions"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get subscriptions successfully", body = StdResponse<Vec<SubscriptionEntity>, String>)
    )
)]
async fn get_my_subscriptions(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<SubscriptionEntity> = subscriptions::table
        .filter(subscriptions::user_id.eq(user_id))
        .order_by(subscriptions::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get subscriptions")?;

    Ok(StdResponse {
        data: Some(rows),
        message: Some("Get subscriptions successfully"),
    })
}

/// Fetch a specific subscription belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Subscriptions"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Subscription ID to fetch")
    ),
    responses(
        (status = 200, description = "Get subscription successfully", body = StdResponse<SubscriptionEntity, String>)
    )
)]
async fn get_subscription(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let subscription: SubscriptionEntity = subscriptions::table
        .find(id)
        .filter(subscriptions::user_id.eq(user_id))
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(subscription),
        message: Some("Get subscription successfully"),
    })
}

async fn owned_subscription(
    conn: &mut diesel_async::AsyncPgConnection,
    id: i32,
    user_id: i32,
) -> Result<SubscriptionEntity, AppError> {
    let subscription: SubscriptionEntity = subscriptions::table
        .find(id)
        .filter(subscriptions::user_id.eq(user_id))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;
    Ok(subscription)
}

fn ensure_transition(
    subscription: &SubscriptionEntity,
    next: SubscriptionStatus,
) -> Result<(), AppError> {
    let current = SubscriptionStatus::parse(&subscription.status)?;
    if !current.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "Subscription in status {} cannot become {}",
            subscription.status,
            next.as_str()
        )));
    }
    Ok(())
}

/// Pause renewals. The next delivery date stays put until resume.
#[utoipa::path(
    post,
    path = "/{id}/pause",
    tags = ["Subscriptions"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Subscription ID to pause")
    ),
    responses(
        (status = 200, description = "Paused subscription successfully", body = StdResponse<SubscriptionEntity, String>)
    )
)]
async fn pause_subscription(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let subscription = owned_subscription(conn, id, user_id).await?;
    ensure_transition(&subscription, SubscriptionStatus::Paused)?;

    let updated: SubscriptionEntity = diesel::update(
        subscriptions::table
            .find(subscription.id)
            .filter(subscriptions::status.eq(subscription.status.clone())),
    )
    .set(subscriptions::status.eq(SubscriptionStatus::Paused.as_str()))
    .returning(SubscriptionEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::Conflict("Subscription changed concurrently, try again".into()))?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Paused subscription successfully"),
    })
}

/// Resume renewals. A next delivery date that slipped into the past while
/// paused moves to tomorrow.
#[utoipa::path(
    post,
    path = "/{id}/resume",
    tags = ["Subscriptions"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Subscription ID to resume")
    ),
    responses(
        (status = 200, description = "Resumed subscription successfully", body = StdResponse<SubscriptionEntity, String>)
    )
)]
async fn resume_subscription(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let subscription = owned_subscription(conn, id, user_id).await?;
    ensure_transition(&subscription, SubscriptionStatus::Active)?;

    let today = Utc::now().date_naive();
    let next_delivery_date = if subscription.next_delivery_date <= today {
        today + Duration::days(1)
    } else {
        subscription.next_delivery_date
    };

    let updated: SubscriptionEntity = diesel::update(
        subscriptions::table
            .find(subscription.id)
            .filter(subscriptions::status.eq(subscription.status.clone())),
    )
    .set((
        subscriptions::status.eq(SubscriptionStatus::Active.as_str()),
        subscriptions::next_delivery_date.eq(next_delivery_date),
    ))
    .returning(SubscriptionEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::Conflict("Subscription changed concurrently, try again".into()))?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Resumed subscription successfully"),
    })
}

/// Cancel a subscription for good.
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tags = ["Subscriptions"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Subscription ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled subscription successfully", body = StdResponse<SubscriptionEntity, String>)
    )
)]
async fn cancel_subscription(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let subscription = owned_subscription(conn, id, user_id).await?;
    ensure_transition(&subscription, SubscriptionStatus::Cancelled)?;

    let updated: SubscriptionEntity = diesel::update(
        subscriptions::table
            .find(subscription.id)
            .filter(subscriptions::status.eq(subscription.status.clone())),
    )
    .set(subscriptions::status.eq(SubscriptionStatus::Cancelled.as_str()))
    .returning(SubscriptionEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::Conflict("Subscription changed concurrently, try again".into()))?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Cancelled subscription successfully"),
    })
}
