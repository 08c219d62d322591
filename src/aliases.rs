use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::Pool;

/// Shorthand for diesel's error type, used when matching query results.
pub type DieselError = diesel::result::Error;

/// The async Postgres pool shared through [`crate::app_state::AppState`].
pub type DbPool = Pool<AsyncPgConnection>;
