use axum::{Router, routing::get};
use std::sync::Arc;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Vonage voice webhooks. Vonage calls them with GET or POST depending on the
/// application's configured HTTP method.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/answer",
            get(webhooks::answer_get).post(webhooks::answer_post),
        )
        .route("/event", get(webhooks::event).post(webhooks::event))
}
