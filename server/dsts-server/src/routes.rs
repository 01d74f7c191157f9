use crate::handlers;
use crate::state::DstsServer;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// The HTTP/JSON surface (spec §6.2). Device and enrollment-token
/// management stay RPC-only — this facade only ever exposes the
/// device/app bootstrap flow and a handful of operational endpoints.
pub fn create_router(state: DstsServer) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/v1/keys", get(handlers::signing_keys))
        .route(
            "/api/v1/deviceauth/challenge",
            get(handlers::device_authentication_challenge),
        )
        .route("/api/v1/deviceauth/token", post(handlers::device_authentication_token))
        .route(
            "/api/v1/appauth/challenge",
            get(handlers::app_authentication_challenge),
        )
        .route("/api/v1/appauth/token", post(handlers::app_authentication_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
