use std::collections::HashMap;

use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{Duration, NaiveDate, Utc};
use diesel::dsl::count_star;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{geo, slots, status::DeliveryStatus},
    events::{DeliveryScheduledEvent, OrderDeliveredEvent},
    middleware::{self, AuthedUser},
    models::{
        AddressEntity, CreateDeliveryEntity, DeliveryEntity, DeliverySlotEntity, OrderEntity,
    },
    outbox,
    schema::{addresses, company_info, deliveries, delivery_slots, orders, users},
};

/// Defines delivery routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let authed = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_slots))
        .routes(utoipa_axum::routes!(get_my_assignments))
        .routes(utoipa_axum::routes!(update_delivery_status))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::user_authorization,
        ));

    let admin = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(schedule_delivery))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/deliveries", authed.merge(admin))
}

#[derive(Deserialize)]
struct SlotsQuery {
    zone: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct SlotRes {
    slot_date: NaiveDate,
    time_window: String,
    zone: String,
    capacity: i32,
    booked: i32,
    remaining: i32,
}

/// Fetch the slot calendar for the coming week.
#[utoipa::path(
    get,
    path = "/slots",
    tags = ["Deliveries"],
    security(("bearerAuth" = [])),
    params(
        ("zone" = Option<String>, Query, description = "Filter by delivery zone")
    ),
    responses(
        (status = 200, description = "Get delivery slots successfully", body = StdResponse<Vec<SlotRes>, String>)
    )
)]
async fn get_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let earliest = slots::earliest_delivery_date(Utc::now());
    let last = earliest + Duration::days(slots::SCHEDULING_HORIZON_DAYS - 1);

    let mut select = delivery_slots::table
        .filter(delivery_slots::slot_date.ge(earliest))
        .filter(delivery_slots::slot_date.le(last))
        .order_by((
            delivery_slots::slot_date.asc(),
            delivery_slots::time_window.asc(),
            delivery_slots::zone.asc(),
        ))
        .into_boxed();
    if let Some(zone) = query.zone {
        select = select.filter(delivery_slots::zone.eq(zone));
    }

    let rows: Vec<DeliverySlotEntity> = select
        .get_results(conn)
        .await
        .context("Failed to get delivery slots")?;

    let slots: Vec<SlotRes> = rows
        .into_iter()
        .map(|slot| SlotRes {
            remaining: (slot.capacity - slot.booked).max(0),
            slot_date: slot.slot_date,
            time_window: slot.time_window,
            zone: slot.zone,
            capacity: slot.capacity,
            booked: slot.booked,
        })
        .collect();

    Ok(StdResponse {
        data: Some(slots),
        message: Some("Get delivery slots successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct ScheduleDeliveryReq {
    order_id: i32,
    scheduled_date: NaiveDate,
    scheduled_window: String,
    courier_id: Option<i32>,
}

/// Book a delivery slot for a confirmed order and put it on a courier's
/// route. Without an explicit courier the least loaded one that day gets
/// the job; with none available the delivery stays unassigned.
#[utoipa::path(
    post,
    path = "/schedule",
    tags = ["Deliveries"],
    security(("bearerAuth" = [])),
    request_body = ScheduleDeliveryReq,
    responses(
        (status = 200, description = "Scheduled delivery successfully", body = StdResponse<DeliveryEntity, String>)
    )
)]
async fn schedule_delivery(
    State(state): State<AppState>,
    Json(body): Json<ScheduleDeliveryReq>,
) -> Result<impl IntoResponse, AppError> {
    if !slots::is_valid_window(&body.scheduled_window) {
        return Err(AppError::BadRequest(format!(
            "{} is not a delivery window",
            body.scheduled_window
        )));
    }
    let earliest = slots::earliest_delivery_date(Utc::now());
    let last = earliest + Duration::days(slots::SCHEDULING_HORIZON_DAYS - 1);
    if body.scheduled_date < earliest || body.scheduled_date > last {
        return Err(AppError::BadRequest(
            "Date is outside the scheduling horizon".into(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let delivery = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = orders::table
                    .find(body.order_id)
                    .get_result(conn)
                    .await
                    .map_err(|_| AppError::NotFound)?;

                if !matches!(
                    order.status.as_str(),
                    "confirmed" | "preparing" | "out_for_delivery"
                ) {
                    return Err(AppError::Conflict(format!(
                        "Order in status {} cannot be scheduled",
                        order.status
                    )));
                }

                let active_deliveries: i64 = deliveries::table
                    .filter(deliveries::order_id.eq(order.id))
                    .filter(deliveries::status.eq_any([
                        "scheduled",
                        "out_for_delivery",
                        "delivered",
                    ]))
                    .count()
                    .get_result(conn)
                    .await
                    .context("Failed to check existing deliveries")?;
                if active_deliveries > 0 {
                    return Err(AppError::Conflict(
                        "Order already has a delivery scheduled".into(),
                    ));
                }

                let address: AddressEntity = addresses::table
                    .find(order.delivery_address_id)
                    .get_result(conn)
                    .await
                    .context("Failed to get delivery address")?;
                let warehouse: (f64, f64) = company_info::table
                    .select((
                        company_info::warehouse_latitude,
                        company_info::warehouse_longitude,
                    ))
                    .first(conn)
                    .await
                    .context("Company record is missing")?;
                let (_fee, zone) =
                    geo::delivery_fee(warehouse, address.latitude.zip(address.longitude))?;
                // Addresses without coordinates book capacity in the outer ring.
                let zone = zone.map(|zone| zone.as_str()).unwrap_or("outer");

                diesel::insert_into(delivery_slots::table)
                    .values((
                        delivery_slots::slot_date.eq(body.scheduled_date),
                        delivery_slots::time_window.eq(body.scheduled_window.clone()),
                        delivery_slots::zone.eq(zone),
                    ))
                    .on_conflict((
                        delivery_slots::slot_date,
                        delivery_slots::time_window,
                        delivery_slots::zone,
                    ))
                    .do_nothing()
                    .execute(conn)
                    .await
                    .context("Failed to materialize delivery slot")?;

                let booked = diesel::update(
                    delivery_slots::table
                        .filter(delivery_slots::slot_date.eq(body.scheduled_date))
                        .filter(delivery_slots::time_window.eq(body.scheduled_window.clone()))
                        .filter(delivery_slots::zone.eq(zone))
                        .filter(delivery_slots::booked.lt(delivery_slots::capacity)),
                )
                .set(delivery_slots::booked.eq(delivery_slots::booked + 1))
                .execute(conn)
                .await
                .context("Failed to book delivery slot")?;
                if booked == 0 {
                    return Err(AppError::Conflict(
                        "That delivery window is fully booked".into(),
                    ));
                }

                let courier_id = match body.courier_id {
                    Some(courier_id) => {
                        users::table
                            .find(courier_id)
                            .filter(users::role.eq("courier"))
                            .select(users::id)
                            .get_result::<i32>(conn)
                            .await
                            .map_err(|_| {
                                AppError::BadRequest(format!(
                                    "User #{courier_id} is not a courier"
                                ))
                            })?;
                        Some(courier_id)
                    }
                    None => pick_courier(conn, body.scheduled_date).await?,
                };

                let delivery: DeliveryEntity = diesel::insert_into(deliveries::table)
                    .values(CreateDeliveryEntity {
                        order_id: order.id,
                        courier_id,
                        scheduled_date: body.scheduled_date,
                        scheduled_window: body.scheduled_window.clone(),
                        zone: Some(zone.into()),
                        status: DeliveryStatus::Scheduled.as_str().into(),
                    })
                    .returning(DeliveryEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create delivery")?;

                outbox::publish(
                    conn,
                    "orders.delivery_scheduled".into(),
                    DeliveryScheduledEvent {
                        delivery_id: delivery.id,
                        order_id: order.id,
                        user_id: order.user_id,
                        order_number: order.order_number.clone(),
                        scheduled_date: delivery.scheduled_date,
                        scheduled_window: delivery.scheduled_window.clone(),
                    },
                )
                .await?;

                Ok::<DeliveryEntity, AppError>(delivery)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(delivery),
        message: Some("Scheduled delivery successfully"),
    })
}

/// Least-loaded courier for the date, or `None` when no couriers exist.
async fn pick_courier(
    conn: &mut AsyncPgConnection,
    date: NaiveDate,
) -> Result<Option<i32>, AppError> {
    let couriers: Vec<i32> = users::table
        .filter(users::role.eq("courier"))
        .select(users::id)
        .get_results(conn)
        .await
        .context("Failed to get couriers")?;
    if couriers.is_empty() {
        return Ok(None);
    }

    let counts: Vec<(Option<i32>, i64)> = deliveries::table
        .filter(deliveries::scheduled_date.eq(date))
        .filter(deliveries::status.eq_any(["scheduled", "out_for_delivery"]))
        .group_by(deliveries::courier_id)
        .select((deliveries::courier_id, count_star()))
        .get_results(conn)
        .await
        .context("Failed to count courier assignments")?;
    let assigned: HashMap<i32, i64> = counts
        .into_iter()
        .filter_map(|(courier_id, count)| courier_id.map(|courier_id| (courier_id, count)))
        .collect();

    Ok(couriers
        .into_iter()
        .min_by_key(|courier_id| assigned.get(courier_id).copied().unwrap_or(0)))
}

#[derive(Serialize, ToSchema)]
struct AssignmentRes {
    delivery: DeliveryEntity,
    order: OrderEntity,
    address: AddressEntity,
    customer_name: String,
    customer_phone: Option<String>,
}

/// Fetch the open deliveries assigned to the authenticated courier.
#[utoipa::path(
    get,
    path = "/my-assignments",
    tags = ["Deliveries"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get assignments successfully", body = StdResponse<Vec<AssignmentRes>, String>)
    )
)]
async fn get_my_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
) -> Result<impl IntoResponse, AppError> {
    if !user.is_courier() && !user.is_admin {
        return Err(AppError::ForbiddenResource(
            "Only couriers have assignments".into(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(DeliveryEntity, OrderEntity, AddressEntity, (String, Option<String>))> =
        deliveries::table
            .inner_join(
                orders::table
                    .inner_join(addresses::table)
                    .inner_join(users::table),
            )
            .filter(deliveries::courier_id.eq(user.id))
            .filter(deliveries::status.eq_any(["scheduled", "out_for_delivery"]))
            .order_by((
                deliveries::scheduled_date.asc(),
                deliveries::scheduled_window.asc(),
            ))
            .select((
                DeliveryEntity::as_select(),
                OrderEntity::as_select(),
                AddressEntity::as_select(),
                (users::first_name, users::phone),
            ))
            .get_results(conn)
            .await
            .context("Failed to get assignments")?;

    let assignments: Vec<AssignmentRes> = rows
        .into_iter()
        .map(
            |(delivery, order, address, (customer_name, customer_phone))| AssignmentRes {
                delivery,
                order,
                address,
                customer_name,
                customer_phone,
            },
        )
        .collect();

    Ok(StdResponse {
        data: Some(assignments),
        message: Some("Get assignments successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateDeliveryStatusReq {
    status: String,
    photo_file_id: Option<String>,
}

/// Move a delivery along its lifecycle. Couriers may only touch their own
/// assignments; completing one also completes the order.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Deliveries"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Delivery ID to update")
    ),
    request_body = UpdateDeliveryStatusReq,
    responses(
        (status = 200, description = "Updated delivery status successfully", body = StdResponse<DeliveryEntity, String>)
    )
)]
async fn update_delivery_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(body): Json<UpdateDeliveryStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    if !user.is_courier() && !user.is_admin {
        return Err(AppError::ForbiddenResource(
            "Only couriers update deliveries".into(),
        ));
    }

    let next = DeliveryStatus::parse(&body.status)?;
    if !matches!(
        next,
        DeliveryStatus::OutForDelivery | DeliveryStatus::Delivered | DeliveryStatus::Failed
    ) {
        return Err(AppError::BadRequest(
            "Deliveries are cancelled through the order".into(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let is_admin = user.is_admin;
    let user_id = user.id;
    let updated = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let delivery: DeliveryEntity = deliveries::table
                    .find(id)
                    .get_result(conn)
                    .await
                    .map_err(|_| AppError::NotFound)?;

                if !is_admin && delivery.courier_id != Some(user_id) {
                    return Err(AppError::ForbiddenResource(
                        "Courier does not own this assignment".into(),
                    ));
                }

                let current = DeliveryStatus::parse(&delivery.status)?;
                if !current.can_transition_to(next) {
                    return Err(AppError::Conflict(format!(
                        "Cannot move delivery from {} to {}",
                        delivery.status, body.status
                    )));
                }

                let updated: DeliveryEntity = match next {
                    DeliveryStatus::Delivered => {
                        diesel::update(
                            deliveries::table
                                .find(delivery.id)
                                .filter(deliveries::status.eq(delivery.status.clone())),
                        )
                        .set((
                            deliveries::status.eq(next.as_str()),
                            deliveries::delivered_at.eq(diesel::dsl::now),
                            deliveries::photo_file_id.eq(body.photo_file_id),
                        ))
                        .returning(DeliveryEntity::as_returning())
                        .get_result(conn)
                        .await
                    }
                    _ => {
                        diesel::update(
                            deliveries::table
                                .find(delivery.id)
                                .filter(deliveries::status.eq(delivery.status.clone())),
                        )
                        .set(deliveries::status.eq(next.as_str()))
                        .returning(DeliveryEntity::as_returning())
                        .get_result(conn)
                        .await
                    }
                }
                .map_err(|_| {
                    AppError::Conflict("Delivery changed concurrently, try again".into())
                })?;

                match next {
                    DeliveryStatus::OutForDelivery => {
                        diesel::update(
                            orders::table
                                .find(updated.order_id)
                                .filter(orders::status.eq_any(["confirmed", "preparing"])),
                        )
                        .set(orders::status.eq("out_for_delivery"))
                        .execute(conn)
                        .await
                        .context("Failed to update order status")?;
                    }
                    DeliveryStatus::Delivered => {
                        let order: OrderEntity = diesel::update(
                            orders::table.find(updated.order_id).filter(
                                orders::status.eq_any([
                                    "confirmed",
                                    "preparing",
                                    "out_for_delivery",
                                ]),
                            ),
                        )
                        .set(orders::status.eq("delivered"))
                        .returning(OrderEntity::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(|_| {
                            AppError::Conflict("Order changed concurrently, try again".into())
                        })?;

                        outbox::publish(
                            conn,
                            "orders.order_delivered".into(),
                            OrderDeliveredEvent {
                                order_id: order.id,
                                user_id: order.user_id,
                                order_number: order.order_number.clone(),
                                total_amount: order.total_amount,
                                delivered_on: Utc::now().date_naive(),
                            },
                        )
                        .await?;
                    }
                    _ => {}
                }

                Ok::<DeliveryEntity, AppError>(updated)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Updated delivery status successfully"),
    })
}
