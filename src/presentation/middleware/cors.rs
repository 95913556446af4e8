//! CORS Middleware Configuration
//!
//! The webhook route is server-to-server and never sees a browser, but
//! the health and metrics endpoints are read from operator dashboards,
//! so the layer stays open on the configured origins.

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsSettings;

/// Create CORS layer from settings
pub fn create_cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins: Vec<_> = settings
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let methods = [Method::GET, Method::POST];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
            .max_age(std::time::Duration::from_secs(3600))
    }
}
