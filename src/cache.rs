use anyhow::{Context, Result};
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Deserialize, Serialize};

/// How long a shared location stays available for address creation.
const LOCATION_TTL_SECS: u64 = 600;

pub async fn connect(redis_url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(redis_url).context("Invalid REDIS_URL")?;
    let manager = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;
    Ok(manager)
}

#[derive(Serialize, Deserialize, Debug)]
struct StashedLocation {
    latitude: f64,
    longitude: f64,
}

/// Stashes coordinates a customer shared ahead of creating an address, so
/// the follow-up request can pick them up without re-sending them.
pub async fn stash_location(
    redis: &mut ConnectionManager,
    telegram_id: i64,
    latitude: f64,
    longitude: f64,
) -> Result<()> {
    let payload = serde_json::to_string(&StashedLocation {
        latitude,
        longitude,
    })?;
    redis
        .set_ex::<_, _, ()>(location_key(telegram_id), payload, LOCATION_TTL_SECS)
        .await
        .context("Failed to stash location")?;
    Ok(())
}

/// Takes (and clears) a previously stashed location.
pub async fn take_location(
    redis: &mut ConnectionManager,
    telegram_id: i64,
) -> Result<Option<(f64, f64)>> {
    let raw: Option<String> = redis
        .get_del(location_key(telegram_id))
        .await
        .context("Failed to read stashed location")?;

    match raw {
        Some(raw) => {
            let location: StashedLocation =
                serde_json::from_str(&raw).context("Malformed stashed location")?;
            Ok(Some((location.latitude, location.longitude)))
        }
        None => Ok(None),
    }
}

/// Fixed-window rate limiter. Returns `false` once the bucket exceeds
/// `limit` hits within `window_secs`.
pub async fn check_rate_limit(
    redis: &mut ConnectionManager,
    bucket: &str,
    limit: i64,
    window_secs: i64,
) -> Result<bool> {
    let key = format!("aquapure:ratelimit:{bucket}");
    let count: i64 = redis
        .incr(&key, 1)
        .await
        .context("Failed to bump rate limit counter")?;
    if count == 1 {
        redis
            .expire::<_, ()>(&key, window_secs)
            .await
            .context("Failed to arm rate limit window")?;
    }
    Ok(count <= limit)
}

fn location_key(telegram_id: i64) -> String {
    format!("aquapure:location:{telegram_id}")
}
