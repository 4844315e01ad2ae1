// =============================================================================
// Inference token extraction — Axum extractor
// =============================================================================
//
// The caller's Hugging Face token travels in the `Authorization` header and is
// used for that request only. It is never stored or logged.
//
//   async fn handler(InferenceToken(token): InferenceToken, ...) { ... }
//
// No header yields `InferenceToken(None)`; the handler then falls back to the
// server's default token. A header that is present but not a usable bearer
// token is rejected with 401 before the handler body executes.
// =============================================================================

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

/// The request's bearer token, if one was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceToken(pub Option<String>);

/// Rejection type returned for a malformed `Authorization` header.
#[derive(Debug)]
pub struct AuthRejection {
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for InferenceToken
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers).map(InferenceToken)
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AuthRejection> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match token {
        Some(t) => Ok(Some(t.to_string())),
        None => {
            warn!("Malformed Authorization header");
            Err(AuthRejection {
                message: "Authorization header must be 'Bearer <token>'",
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
