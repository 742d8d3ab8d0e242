pub mod routes;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Build the full API router. Shared with the handler tests, which drive it
/// through `tower::ServiceExt::oneshot` against a canned provider.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/api/health", get(routes::health))
        .route("/api/stocks/search", get(routes::search_symbols))
        .route("/api/stocks/{symbol}/quote", get(routes::get_quote))
        .route("/api/stocks/{symbol}/volatility", get(routes::get_volatility))
        .route("/api/stocks/{symbol}/validate", get(routes::validate_symbol))
        .route("/api/options/{symbol}/expiries", get(routes::get_expiries))
        .route("/api/options/{symbol}/chain", get(routes::get_chain))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
