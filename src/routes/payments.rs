use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::status::{OrderStatus, PaymentStatus},
    events::OrderPaidEvent,
    models::{OrderEntity, PaymentEntity},
    outbox,
    schema::{orders, payments},
};

/// Defines payment routes with OpenAPI specs. The mock endpoints stand in
/// for provider callbacks and take no bearer token, like a real webhook.
pub fn routes_with_openapi(_state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(mock_pay))
            .routes(utoipa_axum::routes!(mock_fail)),
    )
}

#[derive(Serialize, ToSchema)]
pub struct MockPayRes {
    updated_payment: PaymentEntity,
    updated_order: OrderEntity,
}

/// Mock payment confirmation. Settles the payment and confirms the order.
#[utoipa::path(
    post,
    path = "/{id}/mock-pay",
    tags = ["Payments"],
    params(
        ("id" = Uuid, Path, description = "Payment ID to mark as paid")
    ),
    responses(
        (status = 200, description = "Payment successfully marked as paid", body = StdResponse<MockPayRes, String>)
    )
)]
async fn mock_pay(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (updated_payment, updated_order) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let payment: PaymentEntity = payments::table
                    .find(id)
                    .get_result(conn)
                    .await
                    .map_err(|_| AppError::NotFound)?;

                let current = PaymentStatus::parse(&payment.status)?;
                if !current.can_transition_to(PaymentStatus::Paid) {
                    return Err(AppError::Conflict(format!(
                        "Payment in status {} cannot be paid",
                        payment.status
                    )));
                }

                let updated_payment: PaymentEntity = diesel::update(
                    payments::table
                        .find(payment.id)
                        .filter(payments::status.eq(PaymentStatus::Pending.as_str())),
                )
                .set((
                    payments::status.eq(PaymentStatus::Paid.as_str()),
                    payments::provider_ref
                        .eq(format!("mock-{}", Uuid::new_v4().simple())),
                ))
                .returning(PaymentEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| {
                    AppError::Conflict("Payment changed concurrently, try again".into())
                })?;

                // Confirms the order when it is still waiting on this payment.
                diesel::update(
                    orders::table
                        .find(updated_payment.order_id)
                        .filter(orders::status.eq(OrderStatus::Pending.as_str())),
                )
                .set(orders::status.eq(OrderStatus::Confirmed.as_str()))
                .execute(conn)
                .await
                .context("Failed to update order status")?;

                let updated_order: OrderEntity = orders::table
                    .find(updated_payment.order_id)
                    .get_result(conn)
                    .await
                    .context("Failed to get order")?;

                outbox::publish(
                    conn,
                    "orders.order_paid".into(),
                    OrderPaidEvent {
                        order_id: updated_order.id,
                        user_id: updated_order.user_id,
                        payment_id: updated_payment.id,
                        order_number: updated_order.order_number.clone(),
                        amount: updated_payment.amount,
                    },
                )
                .await?;

                Ok::<(PaymentEntity, OrderEntity), AppError>((updated_payment, updated_order))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(MockPayRes {
            updated_order,
            updated_payment,
        }),
        message: Some("Payment paid successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct MockFailReq {
    reason: Option<String>,
}

/// Mock payment failure. The order stays open so the customer can retry
/// with a fresh payment.
#[utoipa::path(
    post,
    path = "/{id}/mock-fail",
    tags = ["Payments"],
    params(
        ("id" = Uuid, Path, description = "Payment ID to mark as failed")
    ),
    request_body = MockFailReq,
    responses(
        (status = 200, description = "Payment marked as failed", body = StdResponse<PaymentEntity, String>)
    )
)]
async fn mock_fail(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<MockFailReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let payment: PaymentEntity = payments::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let current = PaymentStatus::parse(&payment.status)?;
    if !current.can_transition_to(PaymentStatus::Failed) {
        return Err(AppError::Conflict(format!(
            "Payment in status {} cannot fail",
            payment.status
        )));
    }

    let failure_reason = body.reason.unwrap_or_else(|| "Declined by provider".into());
    let updated: PaymentEntity = diesel::update(
        payments::table
            .find(payment.id)
            .filter(payments::status.eq(PaymentStatus::Pending.as_str())),
    )
    .set((
        payments::status.eq(PaymentStatus::Failed.as_str()),
        payments::failure_reason.eq(failure_reason),
    ))
    .returning(PaymentEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::Conflict("Payment changed concurrently, try again".into()))?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Payment marked as failed"),
    })
}
