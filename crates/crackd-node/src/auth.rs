//! HTTP Basic Authentication for the node API.
//!
//! One shared username/password pair per node. A rejected request is the
//! only case where the API answers with a non-200 status; everything past
//! this middleware speaks the JSON envelope.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use tracing::debug;

/// Shared node credentials.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    username: String,
    password: String,
}

impl AuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

pub async fn require_basic_auth(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    if authorized(request.headers(), &auth) {
        next.run(request).await
    } else {
        debug!(path = %request.uri().path(), "rejected unauthenticated request");
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"crackd\"")],
        )
            .into_response()
    }
}

fn authorized(headers: &HeaderMap, auth: &AuthConfig) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64_STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    match credentials.split_once(':') {
        Some((username, password)) => username == auth.username && password == auth.password,
        None => false,
    }
}
