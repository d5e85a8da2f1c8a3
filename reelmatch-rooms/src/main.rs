use std::sync::Arc;

use reelmatch_rooms::catalog::{CatalogProvider, TmdbClient};
use reelmatch_rooms::config::{AppConfig, StorageBackend};
use reelmatch_rooms::store::{MemoryStore, PgStore, Store};
use reelmatch_rooms::{router, AppState};
use reelmatch_shared::clients::db::create_pool;
use reelmatch_shared::clients::redis::RedisClient;
use reelmatch_shared::middleware::{init_metrics, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("reelmatch-rooms");

    let config = AppConfig::load()?;
    let port = config.port;

    // Store
    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.db_pool_size)?;
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory store, rooms are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Catalog cache is optional
    let redis = match &config.redis_url {
        Some(url) => match RedisClient::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, catalog cache disabled");
                None
            }
        },
        None => None,
    };

    let catalog: Arc<dyn CatalogProvider> = Arc::new(TmdbClient::new(config.tmdb_settings(), redis.clone())?);
    let metrics_handle = init_metrics()?;

    let state = Arc::new(AppState::new(config, store, catalog, redis, metrics_handle));
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "reelmatch-rooms starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
