//! HTTP routes for the sync server.

use crate::error::ServerError;
use crate::service::SyncService;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parley_model::{AuthRequest, ErrorBody, PushRequest};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

/// Shared route state.
#[derive(Clone)]
struct AppState {
    service: Arc<SyncService>,
}

/// Builds the router exposing the three sync endpoints.
pub fn router(service: Arc<SyncService>) -> Router {
    Router::new()
        .route("/auth/google", post(auth_google))
        .route("/sync/push", post(sync_push))
        .route("/sync/pull", get(sync_pull))
        .with_state(AppState { service })
}

#[derive(Debug, Deserialize)]
struct PullParams {
    since: Option<i64>,
}

async fn auth_google(State(state): State<AppState>, body: Bytes) -> Response {
    let request: AuthRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match state.service.handle_auth(&request) {
        Ok(response) => Json(response).into_response(),
        Err(err) => error_response(err),
    }
}

async fn sync_push(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let user = match state.service.authorize(bearer_token(&headers)) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };
    let request: PushRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match state.service.handle_push(&user, &request) {
        Ok(response) => Json(response).into_response(),
        Err(err) => error_response(err),
    }
}

async fn sync_pull(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PullParams>,
) -> Response {
    let user = match state.service.authorize(bearer_token(&headers)) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };
    match state.service.handle_pull(&user, params.since.unwrap_or(0)) {
        Ok(response) => Json(response).into_response(),
        Err(err) => error_response(err),
    }
}

/// Extracts the bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Parses a JSON body, turning any shape violation into a 400 with an
/// error body (no partial acceptance at the HTTP layer).
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new(format!("malformed request body: {err}"))),
        )
            .into_response()
    })
}

fn error_response(err: ServerError) -> Response {
    let status = match &err {
        ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Store(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, Json(ErrorBody::new(&err))).into_response()
}
