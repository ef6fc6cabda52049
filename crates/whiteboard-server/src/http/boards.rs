//! Board persistence endpoints (`spec.md` §4.7, §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use whiteboard_protocol::board::{BoardData, BoardMetadata};
use whiteboard_store::StoreError;

use super::AppState;

fn store_error_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::BoardNotFound(_) | StoreError::JobNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::NotOwner { .. } => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: StoreError) -> Response {
    let status = store_error_status(&err);
    (status, Json(json!({ "success": false, "message": err.to_string() }))).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub board_name: String,
    pub room_id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub shapes: Vec<whiteboard_protocol::shape::ShapeData>,
    #[serde(default)]
    pub strokes: Vec<whiteboard_protocol::shape::StrokeDelta>,
    #[serde(default)]
    pub eraser_strokes: Vec<whiteboard_protocol::shape::StrokeDelta>,
}

pub async fn save(State(state): State<Arc<AppState>>, Json(req): Json<SaveRequest>) -> Response {
    let data = match &req.room_id {
        Some(room_id) => match state.registry.with_room(room_id, |room| room.board_snapshot()).await {
            Some(snapshot) => snapshot,
            None => {
                return (StatusCode::NOT_FOUND, Json(json!({ "success": false, "message": "room not found" }))).into_response();
            }
        },
        None => BoardData {
            shapes: req.shapes,
            strokes: req.strokes,
            eraser_strokes: req.eraser_strokes,
        },
    };

    match state.boards.save(&req.board_name, &data, &req.username).await {
        Ok(board_id) => Json(json!({ "success": true, "boardId": board_id, "message": "saved" })).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    match state.boards.list().await {
        Ok(boards) => Json(ListResponse { success: true, boards }).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Serialize)]
struct ListResponse {
    success: bool,
    boards: Vec<BoardMetadata>,
}

pub async fn load(State(state): State<Arc<AppState>>, Path(board_id): Path<String>) -> Response {
    match state.boards.load(&board_id).await {
        Ok(board) => Json(json!({ "success": true, "board": board })).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub username: String,
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<String>,
    body: Option<Json<DeleteRequest>>,
) -> Response {
    let requestor = body.map(|Json(b)| b.username).unwrap_or_default();
    match state.boards.delete(&board_id, &requestor).await {
        Ok(()) => Json(json!({ "success": true, "message": "deleted" })).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub board_id: String,
}

pub async fn export(State(state): State<Arc<AppState>>, Json(req): Json<ExportRequest>) -> Response {
    match state.boards.export(&req.board_id).await {
        Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub board_name: String,
    pub data: serde_json::Value,
    pub username: String,
}

pub async fn import(State(state): State<Arc<AppState>>, Json(req): Json<ImportRequest>) -> Response {
    match state.boards.import(&req.board_name, req.data, &req.username).await {
        Ok(board_id) => Json(json!({ "success": true, "boardId": board_id })).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelapseRequest {
    pub board_id: String,
    #[serde(default)]
    pub duration: Option<u32>,
}

/// `generateTimelapse` only registers the job; the actual render is an
/// external collaborator (`spec.md` §1, `whiteboard_store::timelapse`).
pub async fn generate_timelapse(State(state): State<Arc<AppState>>, Json(req): Json<TimelapseRequest>) -> Response {
    if state.boards.load(&req.board_id).await.is_err() {
        return (StatusCode::NOT_FOUND, Json(json!({ "success": false, "message": "board not found" }))).into_response();
    }
    let job_id = state.timelapses.generate(&req.board_id);
    (StatusCode::ACCEPTED, Json(json!({ "jobId": job_id, "status": "queued" }))).into_response()
}

pub async fn timelapse_status(State(state): State<Arc<AppState>>, Path(job_id): Path<String>) -> Response {
    match state.timelapses.status(&job_id) {
        Ok(job) => {
            let video_url = matches!(job.status, whiteboard_protocol::board::TimelapseStatus::Done)
                .then(|| format!("/api/boards/timelapse-video/{job_id}"));
            Json(json!({
                "status": job.status,
                "progress": job.progress,
                "message": job.message,
                "videoUrl": video_url,
            }))
            .into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn timelapse_video(State(state): State<Arc<AppState>>, Path(job_id): Path<String>) -> Response {
    match state.timelapses.video_bytes(&job_id).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "video/mp4".to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{job_id}.mp4\"")),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}
