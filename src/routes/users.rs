use anyhow::{Context, Result};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::AsChangeset;
use diesel::upsert::excluded;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    cache,
    domain::slots,
    middleware::{self, SESSION_TTL_HOURS, generate_session_token, hash_token},
    models::{
        CreateUserEntity, CreateUserSessionEntity, UpsertUserPreferencesEntity, UserEntity,
        UserPreferencesEntity,
    },
    schema::{user_preferences, user_sessions, users},
};

/// Registrations allowed per Telegram account per hour.
const REGISTER_RATE_LIMIT: i64 = 10;
const REGISTER_RATE_WINDOW_SECS: i64 = 3600;

/// Defines user, session and preference routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new().routes(utoipa_axum::routes!(register));

    let authed = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_me))
        .routes(utoipa_axum::routes!(update_me))
        .routes(utoipa_axum::routes!(get_my_preferences))
        .routes(utoipa_axum::routes!(update_my_preferences))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::user_authorization,
        ));

    let admin = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_users))
        .routes(utoipa_axum::routes!(set_vip))
        .routes(utoipa_axum::routes!(set_role))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/users", public.merge(authed).merge(admin))
}

fn normalize_language(code: Option<&str>) -> String {
    match code {
        Some("uz") => "uz".to_string(),
        Some("ru") => "ru".to_string(),
        _ => "en".to_string(),
    }
}

#[derive(Deserialize, ToSchema)]
struct RegisterReq {
    telegram_id: i64,
    username: Option<String>,
    first_name: String,
    last_name: Option<String>,
    language_code: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct RegisterRes {
    user: UserEntity,
    token: String,
    expires_at: DateTime<Utc>,
}

/// Register or refresh the account behind a Telegram identity and issue a
/// session token. Repeat calls update the visible profile fields.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Users"],
    request_body = RegisterReq,
    responses(
        (status = 200, description = "Registered successfully", body = StdResponse<RegisterRes, String>)
    )
)]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterReq>,
) -> Result<impl IntoResponse, AppError> {
    let mut redis = state.redis.clone();
    let allowed = cache::check_rate_limit(
        &mut redis,
        &format!("register:{}", body.telegram_id),
        REGISTER_RATE_LIMIT,
        REGISTER_RATE_WINDOW_SECS,
    )
    .await?;
    if !allowed {
        return Err(AppError::RateLimited);
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let language_code = normalize_language(body.language_code.as_deref());
    let token = generate_session_token();
    let token_hash = hash_token(&token);
    let expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);

    let user = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let user: UserEntity = diesel::insert_into(users::table)
                    .values(CreateUserEntity {
                        telegram_id: body.telegram_id,
                        username: body.username,
                        first_name: body.first_name,
                        last_name: body.last_name,
                        language_code,
                    })
                    .on_conflict(users::telegram_id)
                    .do_update()
                    .set((
                        users::username.eq(excluded(users::username)),
                        users::first_name.eq(excluded(users::first_name)),
                        users::last_name.eq(excluded(users::last_name)),
                        users::last_activity.eq(diesel::dsl::now),
                    ))
                    .returning(UserEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to upsert user")?;

                diesel::insert_into(user_sessions::table)
                    .values(CreateUserSessionEntity {
                        user_id: user.id,
                        token_hash,
                        expires_at,
                    })
                    .execute(conn)
                    .await
                    .context("Failed to create session")?;

                Ok::<UserEntity, anyhow::Error>(user)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(RegisterRes {
            user,
            token,
            expires_at,
        }),
        message: Some("Registered successfully"),
    })
}

/// Fetch the authenticated user's profile.
#[utoipa::path(
    get,
    path = "/me",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get profile successfully", body = StdResponse<UserEntity, String>)
    )
)]
async fn get_me(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = users::table.find(user_id).get_result(conn).await?;

    Ok(StdResponse {
        data: Some(user),
        message: Some("Get profile successfully"),
    })
}

#[derive(Deserialize, AsChangeset, ToSchema)]
#[diesel(table_name = crate::schema::users)]
struct UpdateProfileReq {
    phone: Option<String>,
    email: Option<String>,
    language_code: Option<String>,
}

/// Update contact details of the authenticated user.
#[utoipa::path(
    patch,
    path = "/me",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Updated profile successfully", body = StdResponse<UserEntity, String>)
    )
)]
async fn update_me(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<UpdateProfileReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.phone.is_none() && body.email.is_none() && body.language_code.is_none() {
        return Err(AppError::BadRequest("Nothing to update".into()));
    }
    if let Some(code) = body.language_code.as_deref() {
        if !matches!(code, "en" | "uz" | "ru") {
            return Err(AppError::BadRequest(format!(
                "{code} is not a supported language"
            )));
        }
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = diesel::update(users::table.find(user_id))
        .set(body)
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to update profile")?;

    Ok(StdResponse {
        data: Some(user),
        message: Some("Updated profile successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct GetPreferencesRes {
    notify_telegram: bool,
    notify_sms: bool,
    notify_email: bool,
    preferred_window: Option<String>,
}

/// Fetch notification preferences, falling back to the defaults when the
/// user never saved any.
#[utoipa::path(
    get,
    path = "/me/preferences",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get preferences successfully", body = StdResponse<GetPreferencesRes, String>)
    )
)]
async fn get_my_preferences(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let prefs: Option<UserPreferencesEntity> = user_preferences::table
        .find(user_id)
        .get_result(conn)
        .await
        .optional()
        .context("Failed to get preferences")?;

    let res = match prefs {
        Some(prefs) => GetPreferencesRes {
            notify_telegram: prefs.notify_telegram,
            notify_sms: prefs.notify_sms,
            notify_email: prefs.notify_email,
            preferred_window: prefs.preferred_window,
        },
        None => GetPreferencesRes {
            notify_telegram: true,
            notify_sms: false,
            notify_email: false,
            preferred_window: None,
        },
    };

    Ok(StdResponse {
        data: Some(res),
        message: Some("Get preferences successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdatePreferencesReq {
    notify_telegram: bool,
    notify_sms: bool,
    notify_email: bool,
    preferred_window: Option<String>,
}

/// Save notification preferences for the authenticated user.
#[utoipa::path(
    put,
    path = "/me/preferences",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    request_body = UpdatePreferencesReq,
    responses(
        (status = 200, description = "Saved preferences successfully", body = StdResponse<UserPreferencesEntity, String>)
    )
)]
async fn update_my_preferences(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<UpdatePreferencesReq>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(window) = body.preferred_window.as_deref() {
        if !slots::is_valid_window(window) {
            return Err(AppError::BadRequest(format!(
                "{window} is not a delivery window"
            )));
        }
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let prefs: UserPreferencesEntity = diesel::insert_into(user_preferences::table)
        .values(UpsertUserPreferencesEntity {
            user_id,
            notify_telegram: body.notify_telegram,
            notify_sms: body.notify_sms,
            notify_email: body.notify_email,
            preferred_window: body.preferred_window,
        })
        .on_conflict(user_preferences::user_id)
        .do_update()
        .set((
            user_preferences::notify_telegram.eq(excluded(user_preferences::notify_telegram)),
            user_preferences::notify_sms.eq(excluded(user_preferences::notify_sms)),
            user_preferences::notify_email.eq(excluded(user_preferences::notify_email)),
            user_preferences::preferred_window.eq(excluded(user_preferences::preferred_window)),
        ))
        .returning(UserPreferencesEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to save preferences")?;

    Ok(StdResponse {
        data: Some(prefs),
        message: Some("Saved preferences successfully"),
    })
}

/// Fetch all users, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all users", body = StdResponse<Vec<UserEntity>, String>)
    )
)]
async fn get_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let users: Vec<UserEntity> = users::table
        .order_by(users::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get users")?;

    Ok(StdResponse {
        data: Some(users),
        message: Some("Get users successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct SetVipReq {
    is_vip: bool,
}

/// Grant or revoke the VIP discount for a user.
#[utoipa::path(
    patch,
    path = "/{id}/vip",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "User ID to update")
    ),
    request_body = SetVipReq,
    responses(
        (status = 200, description = "Updated VIP flag successfully", body = StdResponse<UserEntity, String>)
    )
)]
async fn set_vip(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<SetVipReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = diesel::update(users::table.find(id))
        .set(users::is_vip.eq(body.is_vip))
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(user),
        message: Some("Updated VIP flag successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct SetRoleReq {
    role: String,
}

/// Assign the customer or courier role to a user.
#[utoipa::path(
    patch,
    path = "/{id}/role",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "User ID to update")
    ),
    request_body = SetRoleReq,
    responses(
        (status = 200, description = "Updated role successfully", body = StdResponse<UserEntity, String>)
    )
)]
async fn set_role(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<SetRoleReq>,
) -> Result<impl IntoResponse, AppError> {
    if !matches!(body.role.as_str(), "customer" | "courier") {
        return Err(AppError::BadRequest(format!(
            "{} is not an assignable role",
            body.role
        )));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = diesel::update(users::table.find(id))
        .set(users::role.eq(body.role))
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(user),
        message: Some("Updated role successfully"),
    })
}
