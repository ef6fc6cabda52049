//! HTTP Control Plane (`spec.md` §6, `SPEC_FULL.md` §6 ambient CORS detail).
//!
//! Board persistence, auth, and image upload ride axum on their own
//! listener (`http_bind_addr`), separate from the hand-rolled WebSocket
//! surface in `network.rs` — grounded on the teacher's `ws_router()`
//! (`tallow_relay::websocket`): a `Router` built with `.with_state(...)` and
//! a permissive `CorsLayer`.

mod auth;
mod boards;
mod images;

use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use whiteboard_store::{BoardStore, CredentialStore, ImageStore, TimelapseStore};

use crate::registry::RoomRegistry;

pub struct AppState {
    pub boards: BoardStore,
    pub images: ImageStore,
    pub timelapses: TimelapseStore,
    pub credentials: Mutex<CredentialStore>,
    pub registry: Arc<RoomRegistry>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/boards/save", post(boards::save))
        .route("/api/boards/list", get(boards::list))
        .route("/api/boards/load/:board_id", get(boards::load))
        .route("/api/boards/delete/:board_id", delete(boards::delete))
        .route("/api/boards/export", post(boards::export))
        .route("/api/boards/import", post(boards::import))
        .route("/api/boards/generate-timelapse", post(boards::generate_timelapse))
        .route("/api/boards/timelapse-status/:job_id", get(boards::timelapse_status))
        .route("/api/boards/timelapse-video/:job_id", get(boards::timelapse_video))
        .route("/api/boards/uploadImage", post(images::upload_image))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/check", post(auth::check))
        .layer(cors)
        .with_state(state)
}
