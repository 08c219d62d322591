use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::prelude::AsChangeset;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::{CreateProductEntity, ProductEntity},
    schema::products,
};

/// Defines catalog routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_products))
        .routes(utoipa_axum::routes!(get_product));

    let admin = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_all_products))
        .routes(utoipa_axum::routes!(create_product))
        .routes(utoipa_axum::routes!(update_product))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/products", public.merge(admin))
}

/// Fetch the active catalog, smallest bottles first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    responses(
        (status = 200, description = "Get products successfully", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<ProductEntity> = products::table
        .filter(products::is_active.eq(true))
        .order_by(products::volume_liters.asc())
        .get_results(conn)
        .await
        .context("Failed to get products")?;

    Ok(StdResponse {
        data: Some(rows),
        message: Some("Get products successfully"),
    })
}

/// Fetch a single product.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = i32, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn get_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = products::table.find(id).get_result(conn).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Get product successfully"),
    })
}

/// Fetch the whole catalog including deactivated products.
#[utoipa::path(
    get,
    path = "/all",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get all products successfully", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_all_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<ProductEntity> = products::table
        .order_by(products::volume_liters.asc())
        .get_results(conn)
        .await
        .context("Failed to get products")?;

    Ok(StdResponse {
        data: Some(rows),
        message: Some("Get all products successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateProductReq {
    name: String,
    description: String,
    volume_liters: f64,
    price: f64,
    stock_quantity: i32,
}

/// Add a product to the catalog.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    request_body = CreateProductReq,
    responses(
        (status = 200, description = "Created product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.price <= 0.0 {
        return Err(AppError::BadRequest("Price must be positive".into()));
    }
    if body.volume_liters <= 0.0 {
        return Err(AppError::BadRequest("Volume must be positive".into()));
    }
    if body.stock_quantity < 0 {
        return Err(AppError::BadRequest(
            "Stock quantity cannot be negative".into(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::insert_into(products::table)
        .values(CreateProductEntity {
            name: body.name,
            description: body.description,
            volume_liters: body.volume_liters,
            price: body.price,
            stock_quantity: body.stock_quantity,
        })
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create product")?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Created product successfully"),
    })
}

#[derive(Deserialize, AsChangeset, ToSchema)]
#[diesel(table_name = crate::schema::products)]
struct UpdateProductReq {
    name: Option<String>,
    description: Option<String>,
    volume_liters: Option<f64>,
    price: Option<f64>,
    stock_quantity: Option<i32>,
    is_active: Option<bool>,
}

/// Update catalog fields of a product.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to update")
    ),
    request_body = UpdateProductReq,
    responses(
        (status = 200, description = "Updated product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn update_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    if matches!(body.price, Some(price) if price <= 0.0) {
        return Err(AppError::BadRequest("Price must be positive".into()));
    }
    if matches!(body.volume_liters, Some(volume) if volume <= 0.0) {
        return Err(AppError::BadRequest("Volume must be positive".into()));
    }
    if matches!(body.stock_quantity, Some(stock) if stock < 0) {
        return Err(AppError::BadRequest(
            "Stock quantity cannot be negative".into(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::update(products::table.find(id))
        .set(body)
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::QueryBuilderError(_) => AppError::BadRequest("Nothing to update".into()),
            err => err.into(),
        })?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Updated product successfully"),
    })
}
