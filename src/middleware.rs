use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{
    app_error::AppError,
    app_state::AppState,
    schema::{user_sessions, users},
};

/// Sessions issued at registration stay valid for a day.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Identity resolved from the bearer token, injected as a request extension
/// alongside the plain user id.
#[derive(Clone, Debug)]
pub struct AuthedUser {
    pub id: i32,
    pub telegram_id: i64,
    pub role: String,
    pub is_admin: bool,
    pub is_vip: bool,
}

impl AuthedUser {
    pub fn is_courier(&self) -> bool {
        self.role == "courier"
    }
}

/// Requires a valid session token and injects the caller's identity.
pub async fn user_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(user.id);
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Requires a valid session token belonging to an administrator.
pub async fn admin_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    if !user.is_admin {
        return Err(AppError::ForbiddenResource(
            "Administrator access required".into(),
        ));
    }
    req.extensions_mut().insert(user.id);
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthedUser, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (id, telegram_id, role, is_admin, is_vip): (i32, i64, String, bool, bool) =
        user_sessions::table
            .inner_join(users::table)
            .filter(user_sessions::token_hash.eq(hash_token(token)))
            .filter(user_sessions::expires_at.gt(diesel::dsl::now))
            .select((
                users::id,
                users::telegram_id,
                users::role,
                users::is_admin,
                users::is_vip,
            ))
            .first(conn)
            .await
            .map_err(|_| AppError::Unauthorized)?;

    Ok(AuthedUser {
        id,
        telegram_id,
        role,
        is_admin,
        is_vip,
    })
}

/// Generates an opaque session token. Only its hash is persisted.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_deterministic_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, hash_token("abd"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_tokens_are_unique_and_opaque() {
        let first = generate_session_token();
        let second = generate_session_token();
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
    }
}
