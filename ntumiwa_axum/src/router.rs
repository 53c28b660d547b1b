//! The application router

use axum::{Router, extract::Request, middleware, routing::get};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use uuid::Uuid;

use crate::middleware::{require_auth, session_layer};
use crate::state::AppState;

/// Builds the full router: public routes (`/health`, `/performances`, `/auth/*`) and the
/// catalog routes behind the auth guard, all inside the session layer and HTTP tracing.
///
/// Every request gets a span carrying a fresh `request_id`.
pub fn app_router(state: AppState) -> Router {
    let protected = super::catalog::router()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .route("/performances", get(super::catalog::performances))
        .nest("/auth", super::auth::router())
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = Uuid::new_v4();
                    tracing::info_span!(
                        "request",
                        %request_id,
                        method = %request.method(),
                        path = %request.uri().path()
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
