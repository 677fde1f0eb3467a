//! CampuShare backend server binary.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campushare_backend::api::{routes::create_router, AppState};
use campushare_backend::config::Config;
use campushare_backend::db::create_pool;
use campushare_backend::error::Result;
use campushare_backend::queue::handlers::JobContext;
use campushare_backend::queue::postgres::{JobWorker, PgJobQueue};
use campushare_backend::storage::s3::S3Store;
use campushare_backend::store::postgres::PgResourceStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "campushare_backend={},tower_http=debug",
                config.log_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CampuShare backend");

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgResourceStore::new(pool.clone()));
    let objects = Arc::new(S3Store::from_config(&config)?);
    let queue = Arc::new(PgJobQueue::new(pool.clone()));

    // Background worker draining the job queue
    JobWorker::new(
        pool.clone(),
        JobContext {
            store: store.clone(),
            objects: objects.clone(),
            queue: queue.clone(),
        },
        Duration::from_secs(config.queue_poll_interval_secs),
    )
    .spawn();

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState::new(config, store, objects, queue));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Listening on {}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
