//! Basic Authentication middleware for the private API.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use shared::crypto::constant_time_eq;

use crate::app::AppState;
use crate::error::ApiError;

/// Middleware that requires HTTP Basic Authentication against the single
/// configured credential pair. Comparison is constant-time so neither the
/// username nor the password leaks through timing.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some((username, password)) = basic_credentials(&req) else {
        return unauthorized();
    };

    // Evaluate both comparisons before branching.
    let username_match = constant_time_eq(&username, &state.config.auth.username);
    let password_match = constant_time_eq(&password, &state.config.auth.password);

    if !username_match || !password_match {
        return unauthorized();
    }

    next.run(req).await
}

/// Extracts the `(username, password)` pair from an
/// `Authorization: Basic <base64>` header, if present and well-formed.
fn basic_credentials(req: &Request<Body>) -> Option<(String, String)> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized() -> Response {
    ApiError::Unauthorized("Invalid or missing credentials".to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_auth(value: &str) -> Request<Body> {
        Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn parses_well_formed_header() {
        let encoded = STANDARD.encode("admin:s3cret");
        let req = request_with_auth(&format!("Basic {encoded}"));
        assert_eq!(
            basic_credentials(&req),
            Some(("admin".to_string(), "s3cret".to_string()))
        );
    }

    #[test]
    fn password_may_contain_colons() {
        let encoded = STANDARD.encode("admin:pass:with:colons");
        let req = request_with_auth(&format!("Basic {encoded}"));
        assert_eq!(
            basic_credentials(&req),
            Some(("admin".to_string(), "pass:with:colons".to_string()))
        );
    }

    #[test]
    fn rejects_non_basic_schemes_and_garbage() {
        assert_eq!(basic_credentials(&request_with_auth("Bearer token")), None);
        assert_eq!(basic_credentials(&request_with_auth("Basic !!!")), None);
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(basic_credentials(&req), None);
    }
}
