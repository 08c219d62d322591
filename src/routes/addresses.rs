use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::prelude::AsChangeset;
use diesel::result::DatabaseErrorKind;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    cache,
    middleware::{self, AuthedUser},
    models::{AddressEntity, CreateAddressEntity},
    schema::addresses,
};

/// Defines address book routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let authed = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_addresses))
        .routes(utoipa_axum::routes!(create_address))
        .routes(utoipa_axum::routes!(get_address))
        .routes(utoipa_axum::routes!(update_address))
        .routes(utoipa_axum::routes!(delete_address))
        .routes(utoipa_axum::routes!(set_default_address))
        .routes(utoipa_axum::routes!(share_location))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::user_authorization,
        ));

    OpenApiRouter::new().nest("/addresses", authed)
}

/// Fetch the authenticated user's addresses, default one first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get addresses successfully", body = StdResponse<Vec<AddressEntity>, String>)
    )
)]
async fn get_addresses(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<AddressEntity> = addresses::table
        .filter(addresses::user_id.eq(user_id))
        .order_by((addresses::is_default.desc(), addresses::created_at.desc()))
        .get_results(conn)
        .await
        .context("Failed to get addresses")?;

    Ok(StdResponse {
        data: Some(rows),
        message: Some("Get addresses successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateAddressReq {
    label: String,
    address_line1: String,
    address_line2: Option<String>,
    city: String,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_default: Option<bool>,
    delivery_instructions: Option<String>,
}

/// Add an address to the authenticated user's book. When the request
/// carries no coordinates, a location shared beforehand through
/// `/addresses/location` is consumed instead. The first address a user
/// creates always becomes the default.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    request_body = CreateAddressReq,
    responses(
        (status = 200, description = "Created address successfully", body = StdResponse<AddressEntity, String>)
    )
)]
async fn create_address(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(body): Json<CreateAddressReq>,
) -> Result<impl IntoResponse, AppError> {
    let mut coords = body.latitude.zip(body.longitude);
    if coords.is_none() {
        let mut redis = state.redis.clone();
        coords = cache::take_location(&mut redis, user.telegram_id).await?;
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user_id = user.id;
    let address = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let existing: i64 = addresses::table
                    .filter(addresses::user_id.eq(user_id))
                    .count()
                    .get_result(conn)
                    .await
                    .context("Failed to count addresses")?;

                let is_default = existing == 0 || body.is_default.unwrap_or(false);
                if is_default {
                    diesel::update(addresses::table.filter(addresses::user_id.eq(user_id)))
                        .set(addresses::is_default.eq(false))
                        .execute(conn)
                        .await
                        .context("Failed to clear previous default")?;
                }

                let address: AddressEntity = diesel::insert_into(addresses::table)
                    .values(CreateAddressEntity {
                        user_id,
                        label: body.label,
                        address_line1: body.address_line1,
                        address_line2: body.address_line2,
                        city: body.city,
                        state: body.state,
                        postal_code: body.postal_code,
                        country: body.country,
                        latitude: coords.map(|(lat, _)| lat),
                        longitude: coords.map(|(_, lon)| lon),
                        is_default,
                        delivery_instructions: body.delivery_instructions,
                    })
                    .returning(AddressEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create address")?;

                Ok::<AddressEntity, anyhow::Error>(address)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Created address successfully"),
    })
}

/// Fetch one of the authenticated user's addresses.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Address ID to fetch")
    ),
    responses(
        (status = 200, description = "Get address successfully", body = StdResponse<AddressEntity, String>)
    )
)]
async fn get_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let address: AddressEntity = addresses::table
        .find(id)
        .filter(addresses::user_id.eq(user_id))
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Get address successfully"),
    })
}

#[derive(Deserialize, AsChangeset, ToSchema)]
#[diesel(table_name = crate::schema::addresses)]
struct UpdateAddressReq {
    label: Option<String>,
    address_line1: Option<String>,
    address_line2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    delivery_instructions: Option<String>,
}

/// Update fields of one of the authenticated user's addresses.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Address ID to update")
    ),
    request_body = UpdateAddressReq,
    responses(
        (status = 200, description = "Updated address successfully", body = StdResponse<AddressEntity, String>)
    )
)]
async fn update_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<UpdateAddressReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let address: AddressEntity = diesel::update(
        addresses::table
            .find(id)
            .filter(addresses::user_id.eq(user_id)),
    )
    .set(body)
    .returning(AddressEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|err| match err {
        DieselError::QueryBuilderError(_) => AppError::BadRequest("Nothing to update".into()),
        err => err.into(),
    })?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Updated address successfully"),
    })
}

/// Delete one of the authenticated user's addresses. Addresses referenced
/// by orders cannot be removed.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Address ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted address successfully", body = StdResponse<String, String>)
    )
)]
async fn delete_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let deleted = diesel::delete(
        addresses::table
            .find(id)
            .filter(addresses::user_id.eq(user_id)),
    )
    .execute(conn)
    .await
    .map_err(|err| match err {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            AppError::Conflict("Address is referenced by existing orders".into())
        }
        err => err.into(),
    })?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: Some("Deleted"),
        message: Some("Deleted address successfully"),
    })
}

/// Make one of the authenticated user's addresses the default.
#[utoipa::path(
    post,
    path = "/{id}/default",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Address ID to promote")
    ),
    responses(
        (status = 200, description = "Updated default address successfully", body = StdResponse<AddressEntity, String>)
    )
)]
async fn set_default_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let address = conn
        .transaction(move |conn| {
            Box::pin(async move {
                diesel::update(addresses::table.filter(addresses::user_id.eq(user_id)))
                    .set(addresses::is_default.eq(false))
                    .execute(conn)
                    .await
                    .context("Failed to clear previous default")?;

                let address: AddressEntity = diesel::update(
                    addresses::table
                        .find(id)
                        .filter(addresses::user_id.eq(user_id)),
                )
                .set(addresses::is_default.eq(true))
                .returning(AddressEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::NotFound)?;

                Ok::<AddressEntity, AppError>(address)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Updated default address successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct ShareLocationReq {
    latitude: f64,
    longitude: f64,
}

/// Stash a shared location for a short while so the next address the user
/// creates can pick the coordinates up.
#[utoipa::path(
    post,
    path = "/location",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    request_body = ShareLocationReq,
    responses(
        (status = 200, description = "Stashed location successfully", body = StdResponse<String, String>)
    )
)]
async fn share_location(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(body): Json<ShareLocationReq>,
) -> Result<impl IntoResponse, AppError> {
    if !(-90.0..=90.0).contains(&body.latitude) || !(-180.0..=180.0).contains(&body.longitude) {
        return Err(AppError::BadRequest("Coordinates are out of range".into()));
    }

    let mut redis = state.redis.clone();
    cache::stash_location(&mut redis, user.telegram_id, body.latitude, body.longitude).await?;

    Ok(StdResponse {
        data: Some("Stashed"),
        message: Some("Stashed location successfully"),
    })
}
