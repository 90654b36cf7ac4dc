use async_graphql::dynamic::Schema;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::DEFAULT_CORS_ORIGIN;
use crate::Config;

mod health;
mod query;

// ---

/// Shared state of every route: the process-wide schema.
pub type AppState = Schema;

/// Mount every route. `config` only shapes the middleware.
pub fn router(schema: Schema, config: &Config) -> Router {
    // ---
    let origin = HeaderValue::from_str(&config.cors_allow_origin)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CORS_ORIGIN));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(query::router())
        .merge(health::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(schema)
}
