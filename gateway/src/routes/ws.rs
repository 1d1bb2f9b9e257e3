use axum::{Router, routing::get};
use std::sync::Arc;

use crate::handlers::call;
use crate::state::AppState;
use crate::utils::MEDIA_SOCKET_PATH;

pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new().route(MEDIA_SOCKET_PATH, get(call::media_handler))
}
