use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{geo, orders as pricing, status::OrderStatus},
    events::{OrderCancelledEvent, OrderCreatedEvent, OrderDeliveredEvent},
    middleware,
    models::{
        AddressEntity, CreateOrderEntity, CreateOrderItemEntity, CreatePaymentEntity,
        DeliveryEntity, OrderEntity, OrderItemEntity, PaymentEntity, ProductEntity, UserEntity,
    },
    outbox,
    schema::{
        company_info, deliveries, delivery_slots, order_items, orders, payments, products, users,
    },
};

/// Defines order routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let authed = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_order))
        .routes(utoipa_axum::routes!(get_my_orders))
        .routes(utoipa_axum::routes!(get_order))
        .routes(utoipa_axum::routes!(cancel_order))
        .routes(utoipa_axum::routes!(get_order_tracking))
        .routes(utoipa_axum::routes!(create_payment_for_order))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::user_authorization,
        ));

    let admin = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_orders))
        .routes(utoipa_axum::routes!(update_order_status))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/orders", authed.merge(admin))
}

#[derive(Deserialize, ToSchema)]
struct OrderItemReq {
    product_id: i32,
    quantity: i32,
}

#[derive(Deserialize, ToSchema)]
struct CreateOrderReq {
    delivery_address_id: i32,
    items: Vec<OrderItemReq>,
    loyalty_points_to_use: Option<i32>,
    special_instructions: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct OrderWithItemsRes {
    order: OrderEntity,
    order_items: Vec<OrderItemEntity>,
}

/// Create a new order for the authenticated user. Stock is reserved, the
/// delivery fee is derived from the address zone and discounts are applied
/// in one transaction.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    request_body = CreateOrderReq,
    responses(
        (status = 200, description = "Created order successfully", body = StdResponse<OrderWithItemsRes, String>)
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }
    let requested_points = body.loyalty_points_to_use.unwrap_or(0);
    if requested_points < 0 {
        return Err(AppError::BadRequest(
            "Loyalty points cannot be negative".into(),
        ));
    }

    // Duplicate product lines collapse into one.
    let mut quantities: BTreeMap<i32, i32> = BTreeMap::new();
    for item in &body.items {
        if item.quantity < 1 {
            return Err(AppError::BadRequest(
                "Item quantity must be at least 1".into(),
            ));
        }
        *quantities.entry(item.product_id).or_default() += item.quantity;
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let res = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let address: AddressEntity =
                    address_owned_by(conn, body.delivery_address_id, user_id)
                        .await
                        .map_err(|_| {
                            AppError::ForbiddenResource(
                                "User does not own this delivery address".into(),
                            )
                        })?;

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
                    .find(user_id)
                    .get_result(conn)
                    .await
                    .context("Failed to get user")?;

                let mut subtotal = 0.0;
                let mut reserved: Vec<(i32, i32, f64)> = Vec::with_capacity(quantities.len());
                for (product_id, quantity) in quantities {
                    let product: ProductEntity = diesel::update(
                        products::table
                            .find(product_id)
                            .filter(products::is_active.eq(true))
                            .filter(products::stock_quantity.ge(quantity)),
                    )
                    .set(products::stock_quantity.eq(products::stock_quantity - quantity))
                    .returning(ProductEntity::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|_| {
                        AppError::Conflict(format!(
                            "Product #{product_id} is unavailable in the requested quantity"
                        ))
                    })?;

                    subtotal += product.price * f64::from(quantity);
                    reserved.push((product_id, quantity, product.price));
                }

                let breakdown = pricing::price_order(
                    subtotal,
                    delivery_fee,
                    user.is_vip,
                    false,
                    requested_points,
                    user.loyalty_points,
                );

                if breakdown.loyalty_points_used > 0 {
                    let deducted = diesel::update(
                        users::table
                            .find(user_id)
                            .filter(users::loyalty_points.ge(breakdown.loyalty_points_used)),
                    )
                    .set(
                        users::loyalty_points
                            .eq(users::loyalty_points - breakdown.loyalty_points_used),
                    )
                    .execute(conn)
                    .await
                    .context("Failed to deduct loyalty points")?;
                    if deducted == 0 {
                        return Err(AppError::Conflict(
                            "Loyalty balance changed, try again".into(),
                        ));
                    }
                }

                let placed_on = Utc::now().date_naive();
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        user_id,
                        order_number: pricing::generate_order_number(placed_on),
                        status: OrderStatus::Pending.as_str().into(),
                        subtotal: breakdown.subtotal,
                        delivery_fee: breakdown.delivery_fee,
                        discount_amount: breakdown.discount_amount,
                        loyalty_points_used: breakdown.loyalty_points_used,
                        total_amount: breakdown.total_amount,
                        special_instructions: body.special_instructions,
                        delivery_address_id: address.id,
                        subscription_id: None,
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create order")?;

                let new_items: Vec<CreateOrderItemEntity> = reserved
                    .into_iter()
                    .map(|(product_id, quantity, unit_price)| CreateOrderItemEntity {
                        order_id: order.id,
                        product_id,
                        quantity,
                        unit_price,
                        total_price: unit_price * f64::from(quantity),
                    })
                    .collect();
                let order_items: Vec<OrderItemEntity> = diesel::insert_into(order_items::table)
                    .values(&new_items)
                    .returning(OrderItemEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to create order items")?;

                outbox::publish(
                    conn,
                    "orders.order_created".into(),
                    OrderCreatedEvent {
                        order_id: order.id,
                        user_id,
                        order_number: order.order_number.clone(),
                        total_amount: order.total_amount,
                        placed_on,
                    },
                )
                .await?;

                Ok::<OrderWithItemsRes, AppError>(OrderWithItemsRes { order, order_items })
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(res),
        message: Some("Created order successfully"),
    })
}

async fn address_owned_by(
    conn: &mut AsyncPgConnection,
    address_id: i32,
    user_id: i32,
) -> Result<AddressEntity, diesel::result::Error> {
    use crate::schema::addresses;

    addresses::table
        .find(address_id)
        .filter(addresses::user_id.eq(user_id))
        .get_result(conn)
        .await
}

/// Fetch all orders belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<OrderWithItemsRes>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_orders: Vec<OrderEntity> = orders::table
        .filter(orders::user_id.eq(user_id))
        .order_by(orders::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my orders")?;

    let order_ids: Vec<i32> = my_orders.iter().map(|order| order.id).collect();
    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    let orders_with_items: Vec<OrderWithItemsRes> = my_orders
        .into_iter()
        .map(|order| OrderWithItemsRes {
            order_items: group.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_with_items),
        message: Some("Get my orders successfully"),
    })
}

/// Fetch a specific order belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderWithItemsRes, String>)
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .filter(orders::user_id.eq(user_id))
        .get_result(conn)
        .await?;

    let order_items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    Ok(StdResponse {
        data: Some(OrderWithItemsRes { order, order_items }),
        message: Some("Get order successfully"),
    })
}

/// Cancels an order and undoes everything it reserved: stock goes back,
/// loyalty points return, a scheduled delivery is called off and its slot
/// freed. Runs on the caller's transaction connection.
pub(crate) async fn release_order(
    conn: &mut AsyncPgConnection,
    order: OrderEntity,
) -> Result<OrderEntity, AppError> {
    let cancelled: OrderEntity = diesel::update(
        orders::table
            .find(order.id)
            .filter(orders::status.eq(order.status.clone())),
    )
    .set(orders::status.eq(OrderStatus::Cancelled.as_str()))
    .returning(OrderEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::Conflict("Order changed concurrently, try again".into()))?;

    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(cancelled.id))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;
    for item in &items {
        diesel::update(products::table.find(item.product_id))
            .set(products::stock_quantity.eq(products::stock_quantity + item.quantity))
            .execute(conn)
            .await
            .context("Failed to restore stock")?;
    }

    if cancelled.loyalty_points_used > 0 {
        diesel::update(users::table.find(cancelled.user_id))
            .set(users::loyalty_points.eq(users::loyalty_points + cancelled.loyalty_points_used))
            .execute(conn)
            .await
            .context("Failed to refund loyalty points")?;
    }

    // A settled payment flips to refunded; an open one simply expires.
    diesel::update(
        payments::table
            .filter(payments::order_id.eq(cancelled.id))
            .filter(payments::status.eq("paid")),
    )
    .set(payments::status.eq("refunded"))
    .execute(conn)
    .await
    .context("Failed to refund payment")?;

    let delivery: Option<DeliveryEntity> = deliveries::table
        .filter(deliveries::order_id.eq(cancelled.id))
        .filter(deliveries::status.eq("scheduled"))
        .first(conn)
        .await
        .optional()
        .context("Failed to check for a scheduled delivery")?;
    if let Some(delivery) = delivery {
        diesel::update(deliveries::table.find(delivery.id))
            .set(deliveries::status.eq("cancelled"))
            .execute(conn)
            .await
            .context("Failed to cancel delivery")?;

        if let Some(zone) = delivery.zone {
            diesel::update(
                delivery_slots::table
                    .filter(delivery_slots::slot_date.eq(delivery.scheduled_date))
                    .filter(delivery_slots::time_window.eq(delivery.scheduled_window))
                    .filter(delivery_slots::zone.eq(zone))
                    .filter(delivery_slots::booked.gt(0)),
            )
            .set(delivery_slots::booked.eq(delivery_slots::booked - 1))
            .execute(conn)
            .await
            .context("Failed to release delivery slot")?;
        }
    }

    outbox::publish(
        conn,
        "orders.order_cancelled".into(),
        OrderCancelledEvent {
            order_id: cancelled.id,
            user_id: cancelled.user_id,
            order_number: cancelled.order_number.clone(),
        },
    )
    .await?;

    Ok(cancelled)
}

/// Cancel an order that has not left the warehouse yet.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled order successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn cancel_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cancelled = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = orders::table
                    .find(id)
                    .filter(orders::user_id.eq(user_id))
                    .get_result(conn)
                    .await
                    .map_err(|_| AppError::NotFound)?;

                let current = OrderStatus::parse(&order.status)?;
                if !current.cancellable_by_customer() {
                    return Err(AppError::Conflict(format!(
                        "Order in status {} can no longer be cancelled",
                        order.status
                    )));
                }

                let cancelled = release_order(conn, order).await?;
                Ok::<OrderEntity, AppError>(cancelled)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(cancelled),
        message: Some("Cancelled order successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct TrackingStep {
    label: String,
    at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
struct OrderTrackingRes {
    order: OrderEntity,
    delivery: Option<DeliveryEntity>,
    courier_name: Option<String>,
    timeline: Vec<TrackingStep>,
}

/// Fetch the delivery progress of an order, with a timeline built from the
/// moments the service recorded.
#[utoipa::path(
    get,
    path = "/{id}/tracking",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to track")
    ),
    responses(
        (status = 200, description = "Get order tracking successfully", body = StdResponse<OrderTrackingRes, String>)
    )
)]
async fn get_order_tracking(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .filter(orders::user_id.eq(user_id))
        .get_result(conn)
        .await?;

    let delivery: Option<DeliveryEntity> = deliveries::table
        .filter(deliveries::order_id.eq(order.id))
        .filter(deliveries::status.ne("cancelled"))
        .order_by(deliveries::created_at.desc())
        .first(conn)
        .await
        .optional()
        .context("Failed to get delivery")?;

    let courier_name: Option<String> = match delivery.as_ref().and_then(|d| d.courier_id) {
        Some(courier_id) => users::table
            .find(courier_id)
            .select(users::first_name)
            .get_result(conn)
            .await
            .optional()
            .context("Failed to get courier")?,
        None => None,
    };

    let mut timeline = vec![TrackingStep {
        label: "Order placed".into(),
        at: order.created_at,
    }];
    if order.status == OrderStatus::Cancelled.as_str() {
        timeline.push(TrackingStep {
            label: "Order cancelled".into(),
            at: order.updated_at,
        });
    }
    if let Some(delivery) = &delivery {
        timeline.push(TrackingStep {
            label: format!(
                "Delivery scheduled for {}, {}",
                delivery.scheduled_date.format("%d.%m.%Y"),
                delivery.scheduled_window
            ),
            at: delivery.created_at,
        });
        if delivery.status == "out_for_delivery" {
            timeline.push(TrackingStep {
                label: "Courier on the way".into(),
                at: delivery.updated_at,
            });
        }
        if let Some(delivered_at) = delivery.delivered_at {
            timeline.push(TrackingStep {
                label: "Delivered".into(),
                at: delivered_at,
            });
        }
    }

    Ok(StdResponse {
        data: Some(OrderTrackingRes {
            order,
            delivery,
            courier_name,
            timeline,
        }),
        message: Some("Get order tracking successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePaymentForOrderReq {
    pub provider: String,
}

/// Create a new payment for a pending order.
#[utoipa::path(
    post,
    path = "/{id}/payment",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to create payment for")
    ),
    request_body = CreatePaymentForOrderReq,
    responses(
        (status = 200, description = "Created payment successfully", body = StdResponse<PaymentEntity, String>)
    )
)]
async fn create_payment_for_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<CreatePaymentForOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    match body.provider.as_str() {
        "cash" | "click" | "payme" => {}
        _ => {
            return Err(AppError::BadRequest(format!(
                "{} is not a valid payment provider",
                body.provider
            )));
        }
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .filter(orders::user_id.eq(user_id))
        .get_result(conn)
        .await?;

    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::Conflict(format!(
            "Order in status {} cannot take a new payment",
            order.status
        )));
    }

    let open_payments: i64 = payments::table
        .filter(payments::order_id.eq(order.id))
        .filter(payments::status.eq("pending"))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check open payments")?;
    if open_payments > 0 {
        return Err(AppError::Conflict(
            "Order already has a pending payment".into(),
        ));
    }

    let payment: PaymentEntity = diesel::insert_into(payments::table)
        .values(CreatePaymentEntity {
            order_id: order.id,
            amount: order.total_amount,
            provider: body.provider,
            status: "pending".into(),
        })
        .returning(PaymentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create payment")?;

    Ok(StdResponse {
        data: Some(payment),
        message: Some("Created payment successfully"),
    })
}

#[derive(Deserialize)]
struct ListOrdersQuery {
    status: Option<String>,
}

/// Fetch all orders, optionally narrowed to one status.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by order status")
    ),
    responses(
        (status = 200, description = "Get orders successfully", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut select = orders::table
        .order_by(orders::created_at.desc())
        .into_boxed();
    if let Some(raw) = query.status.as_deref() {
        let status = OrderStatus::parse(raw)?;
        select = select.filter(orders::status.eq(status.as_str()));
    }

    let rows: Vec<OrderEntity> = select
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    Ok(StdResponse {
        data: Some(rows),
        message: Some("Get orders successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateOrderStatusReq {
    status: String,
}

/// Move an order along its lifecycle. Cancelling through here releases
/// stock, points and any scheduled delivery just like a customer
/// cancellation does.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Updated order status successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn update_order_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let next = OrderStatus::parse(&body.status)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = orders::table
                    .find(id)
                    .get_result(conn)
                    .await
                    .map_err(|_| AppError::NotFound)?;

                let current = OrderStatus::parse(&order.status)?;
                if !current.can_transition_to(next) {
                    return Err(AppError::Conflict(format!(
                        "Cannot move order from {} to {}",
                        order.status, body.status
                    )));
                }

                if next == OrderStatus::Cancelled {
                    let cancelled = release_order(conn, order).await?;
                    return Ok::<OrderEntity, AppError>(cancelled);
                }

                let updated: OrderEntity = diesel::update(
                    orders::table
                        .find(order.id)
                        .filter(orders::status.eq(order.status.clone())),
                )
                .set(orders::status.eq(next.as_str()))
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::Conflict("Order changed concurrently, try again".into()))?;

                if next == OrderStatus::Delivered {
                    diesel::update(
                        deliveries::table
                            .filter(deliveries::order_id.eq(updated.id))
                            .filter(deliveries::status.eq_any(["scheduled", "out_for_delivery"])),
                    )
                    .set((
                        deliveries::status.eq("delivered"),
                        deliveries::delivered_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await
                    .context("Failed to close delivery")?;

                    outbox::publish(
                        conn,
                        "orders.order_delivered".into(),
                        OrderDeliveredEvent {
                            order_id: updated.id,
                            user_id: updated.user_id,
                            order_number: updated.order_number.clone(),
                            total_amount: updated.total_amount,
                            delivered_on: Utc::now().date_naive(),
                        },
                    )
                    .await?;
                }

                Ok::<OrderEntity, AppError>(updated)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Updated order status successfully"),
    })
}
