pub mod api;
pub mod webhooks;
pub mod ws;

use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::middleware::signature_middleware;
use crate::state::AppState;

/// Assembles every route of the gateway.
///
/// Webhooks sit behind the signature check (a no-op without a configured secret); the
/// health check and the media websocket are public.
pub fn create_app(state: Arc<AppState>) -> Router {
    let webhook_routes = webhooks::create_webhook_router().layer(
        middleware::from_fn_with_state(state.clone(), signature_middleware),
    );

    api::create_api_router()
        .merge(webhook_routes)
        .merge(ws::create_ws_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
