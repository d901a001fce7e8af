//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    let bounded = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/passphrase",
            get(handlers::passphrase_status)
                .put(handlers::set_passphrase)
                .delete(handlers::clear_passphrase),
        )
        .route("/encrypt", post(handlers::encrypt))
        .route("/decrypt", post(handlers::decrypt))
        .route("/rotate/status", get(handlers::rotation_status))
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT));

    Router::new()
        .route("/rotate", post(handlers::rotate))
        .merge(bounded)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}
