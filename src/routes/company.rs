use anyhow::Context;
use axum::{Json, extract::State, response::IntoResponse};
use diesel::prelude::AsChangeset;
use diesel::SelectableHelper;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::CompanyInfoEntity,
    schema::company_info,
};

/// Defines company card routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new().routes(utoipa_axum::routes!(get_company));

    let admin = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(update_company))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/company", public.merge(admin))
}

/// Fetch the company card shown to customers.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Company"],
    responses(
        (status = 200, description = "Get company info successfully", body = StdResponse<CompanyInfoEntity, String>)
    )
)]
async fn get_company(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let company: CompanyInfoEntity = company_info::table
        .first(conn)
        .await
        .context("Company record is missing")?;

    Ok(StdResponse {
        data: Some(company),
        message: Some("Get company info successfully"),
    })
}

#[derive(Deserialize, AsChangeset, ToSchema)]
#[diesel(table_name = crate::schema::company_info)]
struct UpdateCompanyReq {
    company_name: Option<String>,
    description: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    address: Option<String>,
    business_hours: Option<String>,
    delivery_areas: Option<Vec<String>>,
    warehouse_latitude: Option<f64>,
    warehouse_longitude: Option<f64>,
}

/// Update the company card.
#[utoipa::path(
    put,
    path = "/",
    tags = ["Company"],
    security(("bearerAuth" = [])),
    request_body = UpdateCompanyReq,
    responses(
        (status = 200, description = "Updated company info successfully", body = StdResponse<CompanyInfoEntity, String>)
    )
)]
async fn update_company(
    State(state): State<AppState>,
    Json(body): Json<UpdateCompanyReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let company: CompanyInfoEntity = diesel::update(company_info::table)
        .set(body)
        .returning(CompanyInfoEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::QueryBuilderError(_) => AppError::BadRequest("Nothing to update".into()),
            err => err.into(),
        })?;

    Ok(StdResponse {
        data: Some(company),
        message: Some("Updated company info successfully"),
    })
}
