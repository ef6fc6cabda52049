//! Image Upload Port HTTP adapter (`spec.md` §4.8).

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use whiteboard_protocol::envelope::Outbound;
use whiteboard_protocol::shape::{CommonShapeFields, ImageShape, ShapeData};

use super::AppState;

#[derive(Deserialize)]
pub struct UploadQuery {
    pub room: String,
}

/// `POST /api/boards/uploadImage?room=<name>` (`spec.md` §4.8, steps 1-6).
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Response {
    let Some(room_id) = state.registry.find_room_id_by_name(&query.room).await else {
        return (StatusCode::NOT_FOUND, Json(json!({ "success": false, "message": "room not found" }))).into_response();
    };

    let mut bytes: Option<Vec<u8>> = None;
    let mut extension = "png".to_string();

    while let Ok(Some(field)) = multipart.next_field().await {
        if let Some(name) = field.file_name() {
            if let Some(ext) = name.rsplit('.').next() {
                extension = ext.to_lowercase();
            }
        }
        match field.bytes().await {
            Ok(data) => bytes = Some(data.to_vec()),
            Err(_) => break,
        }
    }

    let Some(bytes) = bytes else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "message": "missing file" }))).into_response();
    };

    let stored = match state.images.store(&bytes, &extension).await {
        Ok(stored) => stored,
        Err(err) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "success": false, "message": err.to_string() }))).into_response();
        }
    };

    let image_url = format!("/images/{}", stored.filename);
    let shape = ShapeData::Image(ImageShape {
        common: CommonShapeFields {
            id: format!("img-{}", uuid::Uuid::new_v4()),
            x: 100.0,
            y: 100.0,
            color: "#000000".to_string(),
            size: 1.0,
            username: String::new(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            fill_color: None,
        },
        url: image_url.clone(),
        width: stored.width as f64,
        height: stored.height as f64,
    });

    // The wire shapeAdded payload is deliberately untyped (it carries `room`,
    // which ShapeData has no field for), so it's built as raw JSON here
    // rather than reusing `Outbound::AddShape`'s typed variant.
    let payload = json!({
        "shapeType": "IMAGE",
        "id": shape.id(),
        "url": image_url,
        "room": query.room,
        "x": 100.0,
        "y": 100.0,
        "width": stored.width,
        "height": stored.height,
    });

    state
        .registry
        .with_room_fanout(&room_id, None, Outbound::ShapeAdded { payload: payload.clone() }, |room| {
            room.upsert_shape(shape);
            room.push_replay(Outbound::ShapeAdded { payload });
        })
        .await;

    Json(json!({
        "success": true,
        "imageUrl": image_url,
        "filename": stored.filename,
    }))
    .into_response()
}
