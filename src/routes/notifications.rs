use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::NotificationEntity,
    schema::notifications,
};

/// Defines notification inbox routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let authed = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_notifications))
        .routes(utoipa_axum::routes!(mark_read))
        .routes(utoipa_axum::routes!(mark_all_read))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::user_authorization,
        ));

    OpenApiRouter::new().nest("/notifications", authed)
}

#[derive(Deserialize)]
struct ListNotificationsQuery {
    unread: Option<bool>,
}

/// Fetch the authenticated user's notifications, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Notifications"],
    security(("bearerAuth" = [])),
    params(
        ("unread" = Option<bool>, Query, description = "Only unread notifications")
    ),
    responses(
        (status = 200, description = "Get notifications successfully", body = StdResponse<Vec<NotificationEntity>, String>)
    )
)]
async fn get_notifications(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut select = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .order_by(notifications::created_at.desc())
        .into_boxed();
    if query.unread.unwrap_or(false) {
        select = select.filter(notifications::is_read.eq(false));
    }

    let rows: Vec<NotificationEntity> = select
        .get_results(conn)
        .await
        .context("Failed to get notifications")?;

    Ok(StdResponse {
        data: Some(rows),
        message: Some("Get notifications successfully"),
    })
}

/// Mark one notification as read.
#[utoipa::path(
    post,
    path = "/{id}/read",
    tags = ["Notifications"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Notification ID to mark read")
    ),
    responses(
        (status = 200, description = "Marked notification read", body = StdResponse<NotificationEntity, String>)
    )
)]
async fn mark_read(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let notification: NotificationEntity = diesel::update(
        notifications::table
            .find(id)
            .filter(notifications::user_id.eq(user_id)),
    )
    .set(notifications::is_read.eq(true))
    .returning(NotificationEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(notification),
        message: Some("Marked notification read"),
    })
}

#[derive(Serialize, ToSchema)]
struct MarkAllReadRes {
    marked: usize,
}

/// Mark every unread notification as read.
#[utoipa::path(
    post,
    path = "/read-all",
    tags = ["Notifications"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Marked all notifications read", body = StdResponse<MarkAllReadRes, String>)
    )
)]
async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let marked = diesel::update(
        notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.eq(false)),
    )
    .set(notifications::is_read.eq(true))
    .execute(conn)
    .await
    .context("Failed to mark notifications read")?;

    Ok(StdResponse {
        data: Some(MarkAllReadRes { marked }),
        message: Some("Marked all notifications read"),
    })
}
