//! Media websocket handler: one upgraded socket is one call session.

use axum::{
    extract::{State, ws::WebSocket, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::session::CallSession;
use crate::core::telephony::{ChannelSink, accept_media};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Maximum WebSocket message size (1 MB); media frames are a few hundred bytes
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

pub async fn media_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> AppResult<Response> {
    if state.shutdown.is_cancelled() {
        return Err(AppError::Unavailable("Shutting down".to_string()));
    }
    info!("Media websocket upgrade requested");

    Ok(ws
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state)))
}

async fn handle_media_socket(socket: WebSocket, state: Arc<AppState>) {
    let expected = state.config.audio.content_type();
    let (source, mut sink, connected) = match accept_media(socket, &expected).await {
        Ok(accepted) => accepted,
        Err(e) => {
            warn!("Media handshake failed: {}", e);
            return;
        }
    };

    let call_id = connected
        .call_uuid
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = info_span!("call", call_id = %call_id);

    async move {
        let capabilities = match state.capabilities.build() {
            Ok(capabilities) => capabilities,
            Err(e) => {
                error!("Cannot build call capabilities: {}", e);
                sink.close().await;
                return;
            }
        };

        let session = CallSession::new(
            call_id.clone(),
            state.config.session_config(),
            capabilities,
            state.shutdown.child_token(),
        );
        let _registration = state.register_call(call_id, session.state());

        let summary = session.run(Box::new(source), Box::new(sink)).await;
        info!(
            turns = summary.turns,
            reason = ?summary.end_reason,
            active_calls = state.active_calls().saturating_sub(1),
            "Call finished"
        );
    }
    .instrument(span)
    .await;
}
