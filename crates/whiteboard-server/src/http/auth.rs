//! Auth endpoints (`spec.md` §6, `/api/auth/*`).
//!
//! `rusqlite::Connection` is synchronous, so every call runs inside
//! `spawn_blocking` rather than being awaited inline (`whiteboard_store::
//! credentials` doc comment).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use whiteboard_store::StoreError;

use super::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub async fn register(State(state): State<Arc<AppState>>, Json(req): Json<Credentials>) -> Response {
    let store = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        let guard = store.credentials.lock().expect("credential store mutex poisoned");
        guard.register(&req.username, &req.password)
    })
    .await
    .expect("register task panicked");

    match result {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "success": true }))).into_response(),
        Err(StoreError::UsernameTaken(_)) => {
            (StatusCode::CONFLICT, Json(json!({ "success": false, "message": "username already registered" }))).into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "success": false, "message": err.to_string() }))).into_response(),
    }
}

pub async fn login(State(state): State<Arc<AppState>>, Json(req): Json<Credentials>) -> Response {
    let store = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        let guard = store.credentials.lock().expect("credential store mutex poisoned");
        guard.login(&req.username, &req.password)
    })
    .await
    .expect("login task panicked");

    match result {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(_) => (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "message": "invalid username or password" }))).into_response(),
    }
}

#[derive(Deserialize)]
pub struct CheckRequest {
    pub username: String,
}

pub async fn check(State(state): State<Arc<AppState>>, Json(req): Json<CheckRequest>) -> Response {
    let store = Arc::clone(&state);
    let exists = tokio::task::spawn_blocking(move || {
        let guard = store.credentials.lock().expect("credential store mutex poisoned");
        guard.exists(&req.username)
    })
    .await
    .expect("check task panicked")
    .unwrap_or(false);

    Json(json!({ "exists": exists })).into_response()
}
