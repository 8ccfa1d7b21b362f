//! HTTP Basic authentication gate.
//!
//! Active only when the context carries credentials. Applied to every route
//! except `/health`.

use axum::extract::State;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use sb_core::Credentials;

use crate::context::AppContext;
use crate::error::AppError;

/// Challenge sent with every 401.
pub const BASIC_CHALLENGE: &str = "Basic realm=\"Restricted\"";

/// Decode an `Authorization: Basic ...` header into `(user, password)`.
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Check a request's `Authorization` header against `credentials`.
pub fn is_authorized(credentials: &Credentials, authorization: Option<&str>) -> bool {
    authorization
        .and_then(parse_basic_auth)
        .is_some_and(|(user, pass)| credentials.matches(&user, &pass))
}

/// Basic-auth middleware.
pub async fn basic_auth_middleware(
    State(ctx): State<AppContext>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(credentials) = ctx.credentials.as_deref() else {
        return next.run(request).await;
    };

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if is_authorized(credentials, authorization) {
        return next.run(request).await;
    }

    tracing::debug!(uri = %request.uri(), "Rejected request without valid credentials");
    let mut response =
        AppError::new(sb_core::Error::Unauthorized("valid credentials required".into()))
            .into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(BASIC_CHALLENGE),
    );
    response
}
