pub mod catalog;
pub mod config;
pub mod models;
pub mod room;
pub mod routes;
pub mod schema;
pub mod store;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use reelmatch_shared::clients::redis::RedisClient;
use reelmatch_shared::middleware::metrics_middleware;

use catalog::CatalogProvider;
use config::AppConfig;
use room::RoomCoordinator;
use store::Store;

pub struct AppState {
    pub config: AppConfig,
    pub rooms: RoomCoordinator,
    pub store: Arc<dyn Store>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub redis: Option<RedisClient>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        catalog: Arc<dyn CatalogProvider>,
        redis: Option<RedisClient>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            config,
            rooms: RoomCoordinator::new(store.clone(), catalog.clone()),
            store,
            catalog,
            redis,
            metrics_handle,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Rooms
        .route(
            "/rooms",
            post(routes::rooms::create_room).get(routes::rooms::find_room),
        )
        .route("/rooms/join", post(routes::rooms::join_room))
        .route("/rooms/filters", post(routes::rooms::submit_filters))
        .route("/rooms/swipe", post(routes::rooms::swipe))
        .route("/rooms/poll", get(routes::rooms::poll))
        // Catalog
        .route("/movies", get(routes::movies::list_movies))
        .route("/movies/:id", get(routes::movies::movie_detail))
        .route("/genres", get(routes::movies::genres))
        .route("/providers", get(routes::movies::providers))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
