//! # Authentication Module
//!
//! Bearer API key check for the databridge HTTP API.
//!
//! Enabled when `DATABRIDGE_API_KEY` is set and non-empty. `/health` stays
//! open for load balancers. The header may carry `Bearer <key>` or the raw key.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Environment variable holding the expected API key.
pub const API_KEY_ENV: &str = "DATABRIDGE_API_KEY";

/// Paths reachable without a key.
const PUBLIC_PATHS: &[&str] = &["/health"];

/// Configured API key, or `None` when authentication is disabled.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())
}

/// Constant-time key comparison.
///
/// Both sides are zero-padded to a common length before `ct_eq`, and the
/// lengths are compared separately.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let (provided, expected) = (provided.as_bytes(), expected.as_bytes());
    let len = provided.len().max(expected.len());

    let mut lhs = vec![0u8; len];
    let mut rhs = vec![0u8; len];
    lhs[..provided.len()].copy_from_slice(provided);
    rhs[..expected.len()].copy_from_slice(expected);

    let same_bytes: bool = lhs.ct_eq(&rhs).into();
    same_bytes && provided.len() == expected.len()
}

/// Reject requests without a valid key with 401.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    let reason = match provided {
        Some(key) if keys_match(key, &expected) => None,
        Some(_) => Some("invalid_api_key"),
        None => Some("missing_authorization_header"),
    };
    let Some(reason) = reason else {
        return Ok(next.run(request).await);
    };

    tracing::warn!(
        event = "auth_failure",
        reason = reason,
        path = request.uri().path(),
        "Authentication failed"
    );
    Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
}

// =============================================================================
// TESTS
// =============================================================================
