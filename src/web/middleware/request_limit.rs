//! Upload request size guard.
//!
//! Rejects a declared `Content-Length` above `max_request_bytes` before the
//! body is read, and caps the body stream itself so requests without a
//! declared length (chunked) are held to the same limit. Reading past the
//! cap fails with a length-limit error that the upload handler reports as
//! 413. The limit is read from settings on every request; 0 means unlimited.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::Limited;
use std::sync::Arc;

use crate::db::SettingsRepository;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

fn declared_length(req: &Request<Body>) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Reject requests whose declared size exceeds the configured limit.
pub async fn limit_request_size(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let max_request = match SettingsRepository::new(state.db.pool())
        .max_request_bytes()
        .await
    {
        Ok(max) => max,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if max_request == 0 {
        return next.run(req).await;
    }

    if let Some(length) = declared_length(&req) {
        if length > max_request {
            tracing::warn!(
                length,
                limit = max_request,
                "Upload request exceeds server limit"
            );
            return ApiError::payload_too_large("request size exceeds server limit")
                .into_response();
        }
    }

    next.run(limit_body(req, max_request)).await
}

/// Cap the body at `limit` bytes.
fn limit_body(req: Request<Body>, limit: u64) -> Request<Body> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    req.map(|body| Body::new(Limited::new(body, limit)))
}
