use axum::{Router, routing::get};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::fetcher::Fetcher;

pub mod handlers;
pub mod models;

pub fn create_router(fetcher: Arc<Fetcher>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/rss", get(handlers::rss_handler))
        .route("/api/image-proxy", get(handlers::image_proxy_handler))
        .route("/api/health", get(handlers::health_handler))
        .with_state(fetcher)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
