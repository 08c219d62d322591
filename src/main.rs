use anyhow::Result;
use aquapure_orderservice::{
    app_state::AppState,
    bootstrap::{self, bootstrap},
    config, consumers, db, routes, swagger,
};
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let state = AppState::init(config).await?;

    let routes = routes::users::routes_with_openapi(state.clone())
        .merge(routes::addresses::routes_with_openapi(state.clone()))
        .merge(routes::products::routes_with_openapi(state.clone()))
        .merge(routes::orders::routes_with_openapi(state.clone()))
        .merge(routes::payments::routes_with_openapi(state.clone()))
        .merge(routes::subscriptions::routes_with_openapi(state.clone()))
        .merge(routes::deliveries::routes_with_openapi(state.clone()))
        .merge(routes::notifications::routes_with_openapi(state.clone()))
        .merge(routes::analytics::routes_with_openapi(state.clone()))
        .merge(routes::company::routes_with_openapi(state.clone()));

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("AquaPure OrderService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    let app = Router::new().merge(routes).merge(swagger_ui);

    tracing::info!("Bootstrapping...");
    bootstrap(
        "AquaPure OrderService",
        app,
        state,
        &[
            ("orders.order_created", consumers::orders::order_created),
            ("orders.order_paid", consumers::orders::order_paid),
            (
                "orders.delivery_scheduled",
                consumers::orders::delivery_scheduled,
            ),
            ("orders.order_delivered", consumers::orders::order_delivered),
            ("orders.order_cancelled", consumers::orders::order_cancelled),
            (
                "orders.delivery_reminder",
                consumers::orders::delivery_reminder,
            ),
            (
                "subscriptions.renewed",
                consumers::subscriptions::subscription_renewed,
            ),
        ],
    )
    .await?;
    Ok(())
}
