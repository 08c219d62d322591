use std::sync::Arc;

use anyhow::Result;
use redis::aio::ConnectionManager;
use reqwest::Client;

use crate::{aliases::DbPool, cache, config::Config, db};

/// Shared application state handed to route handlers, consumers and workers.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub redis: ConnectionManager,
    pub http_client: Client,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn init(config: Config) -> Result<Self> {
        let db_pool = db::build_pool(&config.database.url).await?;
        let redis = cache::connect(&config.redis.url).await?;

        Ok(Self {
            db_pool,
            redis,
            http_client: Client::new(),
            config: Arc::new(config),
        })
    }
}
