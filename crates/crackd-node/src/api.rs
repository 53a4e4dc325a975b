//! The node control API.
//!
//! Request/response operations over the session manager and resource
//! stores. Every handler catches all failures local to its own execution
//! and translates them into the uniform envelope; business failures are
//! always HTTP 200, and only the auth middleware answers non-2xx.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crackd_core::protocol::{Ack, ActionRequest, ApiReply, CreateSessionRequest, UploadRequest};
use crackd_core::{CrackdError, Result, SessionAction};

use crate::auth::{require_basic_auth, AuthConfig};
use crate::manager::{ResourceKind, SessionManager};

/// Builds the authenticated node router.
pub fn router(manager: Arc<SessionManager>, auth: AuthConfig) -> Router {
    Router::new()
        .route("/hashcatInfo", get(node_info))
        .route("/sessionInfo/:name", get(session_info))
        .route("/cracked/:name", get(cracked))
        .route("/createSession", post(create_session))
        .route("/removeSession/:name", get(remove_session))
        .route("/action", post(action))
        .route("/uploadRule", post(upload_rule))
        .route("/uploadMask", post(upload_mask))
        .route("/uploadWordlist", post(upload_wordlist))
        .layer(middleware::from_fn_with_state(auth, require_basic_auth))
        .with_state(manager)
}

/// Wraps a handler outcome in the response envelope.
fn reply<T: Serialize>(result: Result<T>) -> Json<Value> {
    match result {
        Ok(body) => match serde_json::to_value(ApiReply::ok(body)) {
            Ok(value) => Json(value),
            Err(err) => {
                warn!(error = %err, "response serialization failed");
                Json(json!({"response": "error", "message": err.to_string()}))
            }
        },
        Err(err) => {
            warn!(error = %err, "request failed");
            Json(json!({"response": "error", "message": err.to_string()}))
        }
    }
}

/// Parses a JSON request body; malformed bodies become a validation error
/// inside the envelope instead of a transport-level rejection.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|err| CrackdError::validation(format!("malformed request body: {}", err)))
}

async fn node_info(State(manager): State<Arc<SessionManager>>) -> Json<Value> {
    reply(manager.node_info().await)
}

async fn session_info(
    State(manager): State<Arc<SessionManager>>,
    Path(name): Path<String>,
) -> Json<Value> {
    reply(manager.session_details(&name).await)
}

async fn cracked(
    State(manager): State<Arc<SessionManager>>,
    Path(name): Path<String>,
) -> Json<Value> {
    reply(manager.cracked(&name).await)
}

async fn create_session(
    State(manager): State<Arc<SessionManager>>,
    body: Bytes,
) -> Json<Value> {
    reply(async {
        let request: CreateSessionRequest = parse_body(&body)?;
        manager.create_session(request).await?;
        Ok(Ack::default())
    }
    .await)
}

async fn remove_session(
    State(manager): State<Arc<SessionManager>>,
    Path(name): Path<String>,
) -> Json<Value> {
    reply(async {
        manager.remove_session(&name).await?;
        Ok(Ack::default())
    }
    .await)
}

async fn action(State(manager): State<Arc<SessionManager>>, body: Bytes) -> Json<Value> {
    reply(async {
        let request: ActionRequest = parse_body(&body)?;
        let action = SessionAction::parse(&request.action)?;
        manager.apply_action(&request.session, action).await?;
        Ok(Ack::default())
    }
    .await)
}

async fn upload_rule(State(manager): State<Arc<SessionManager>>, body: Bytes) -> Json<Value> {
    reply(upload(&manager, &body, ResourceKind::Rule).await)
}

async fn upload_mask(State(manager): State<Arc<SessionManager>>, body: Bytes) -> Json<Value> {
    reply(upload(&manager, &body, ResourceKind::Mask).await)
}

async fn upload_wordlist(State(manager): State<Arc<SessionManager>>, body: Bytes) -> Json<Value> {
    reply(upload(&manager, &body, ResourceKind::Wordlist).await)
}

async fn upload(manager: &SessionManager, body: &Bytes, kind: ResourceKind) -> Result<Ack> {
    let request: UploadRequest = parse_body(body)?;
    let content = BASE64_STANDARD
        .decode(request.content.as_bytes())
        .map_err(|err| CrackdError::validation(format!("content is not valid base64: {}", err)))?;
    manager.upload(kind, &request.name, &content).await?;
    Ok(Ack::default())
}
