//! Vonage voice webhooks.
//!
//! `answer` tells Vonage to bridge the call into the media websocket; `event` receives
//! call lifecycle notifications, which only need acknowledging.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::HOST},
    response::Json,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::telephony::{AnswerParams, CallEvent, NccoAction, answer_ncco};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::utils::media_socket_url;

/// Answer webhook, GET flavour (parameters in the query string).
pub async fn answer_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AnswerParams>,
) -> AppResult<Json<Vec<NccoAction>>> {
    answer(&state, &headers, params)
}

/// Answer webhook, POST flavour (parameters in a JSON body).
///
/// An unreadable body still gets answered; the parameters are informational.
pub async fn answer_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Vec<NccoAction>>> {
    let params = if body.is_empty() {
        AnswerParams::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!("Unreadable answer payload: {}", e);
            AnswerParams::default()
        })
    };
    answer(&state, &headers, params)
}

fn answer(
    state: &AppState,
    headers: &HeaderMap,
    params: AnswerParams,
) -> AppResult<Json<Vec<NccoAction>>> {
    if state.shutdown.is_cancelled() {
        return Err(AppError::Unavailable("Shutting down".to_string()));
    }

    let host = headers.get(HOST).and_then(|value| value.to_str().ok());
    let uri = media_socket_url(state.config.public_url.as_deref(), host)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    info!(
        call_uuid = ?params.uuid,
        conversation_uuid = ?params.conversation_uuid,
        from = ?params.from,
        to = ?params.to,
        uri = %uri,
        "Answering call"
    );

    Ok(Json(answer_ncco(
        &uri,
        &state.config.audio.content_type(),
        params.uuid.as_deref(),
    )))
}

/// Event webhook. Always acknowledged with an empty 200.
pub async fn event(body: Bytes) -> StatusCode {
    match serde_json::from_slice::<CallEvent>(&body) {
        Ok(event) => info!(
            status = ?event.status,
            call_uuid = ?event.uuid,
            direction = ?event.direction,
            timestamp = ?event.timestamp,
            "Call event"
        ),
        Err(e) => debug!(bytes = body.len(), "Unparsed call event: {}", e),
    }
    StatusCode::OK
}
