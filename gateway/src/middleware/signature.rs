//! Vonage signed webhook verification
//!
//! Vonage signs webhook requests with an HS256 JWT in `Authorization: Bearer <token>`,
//! keyed with the account signature secret. The `payload_hash` claim is the hex SHA-256
//! of the request body, so a valid token also pins the body it was issued for.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::errors::AppError;
use crate::state::AppState;

/// Webhook bodies are small JSON documents
const MAX_WEBHOOK_BODY: usize = 64 * 1024;

/// Oldest accepted `iat`, in seconds
const MAX_TOKEN_AGE_SECS: u64 = 300;

/// Allowed clock skew for `iat` in the future, in seconds
const CLOCK_SKEW_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token issued outside the accepted window")]
    Stale,

    #[error("Payload hash does not match the request body")]
    PayloadMismatch,
}

/// Claims Vonage puts in a signed webhook token.
#[derive(Debug, Clone, Deserialize)]
pub struct VonageClaims {
    pub iat: Option<u64>,
    pub jti: Option<String>,
    pub iss: Option<String>,
    pub payload_hash: Option<String>,
    pub api_key: Option<String>,
    pub application_id: Option<String>,
}

/// Verifies a signed webhook token against the body it arrived with.
pub fn verify_signed_request(
    secret: &str,
    token: &str,
    body: &[u8],
    now_secs: u64,
) -> Result<VonageClaims, SignatureError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let claims = decode::<VonageClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| SignatureError::InvalidToken(e.to_string()))?
    .claims;

    if let Some(iat) = claims.iat
        && (iat + MAX_TOKEN_AGE_SECS < now_secs || iat > now_secs + CLOCK_SKEW_SECS)
    {
        return Err(SignatureError::Stale);
    }

    match claims.payload_hash.as_deref() {
        Some(expected) => {
            let actual = hex::encode(Sha256::digest(body));
            let expected = expected.to_ascii_lowercase();
            if !bool::from(actual.as_bytes().ct_eq(expected.as_bytes())) {
                return Err(SignatureError::PayloadMismatch);
            }
        }
        None if !body.is_empty() => return Err(SignatureError::PayloadMismatch),
        None => {}
    }

    Ok(claims)
}

fn bearer_token(request: &Request) -> Result<String, SignatureError> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(SignatureError::MissingToken)
}

/// Rejects unsigned or tampered webhook requests when a signature secret is configured.
pub async fn signature_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state
        .config
        .vonage_signature_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
    else {
        return Ok(next.run(request).await);
    };

    let path = request.uri().path().to_string();
    let token = bearer_token(&request).map_err(|e| {
        tracing::warn!(path = %path, "Webhook rejected: {}", e);
        AppError::Unauthorized(e.to_string())
    })?;

    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_WEBHOOK_BODY)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {e}")))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();

    match verify_signed_request(secret, &token, &body, now) {
        Ok(claims) => {
            tracing::debug!(path = %path, jti = ?claims.jti, "Webhook signature verified");
            Ok(next.run(Request::from_parts(parts, Body::from(body))).await)
        }
        Err(e) => {
            tracing::warn!(path = %path, "Webhook rejected: {}", e);
            Err(AppError::Unauthorized(e.to_string()))
        }
    }
}
