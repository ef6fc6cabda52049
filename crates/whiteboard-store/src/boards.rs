//! Board snapshot persistence (`spec.md` §4.7).
//!
//! The registry (`registry.json`) is the list of [`BoardMetadata`] the
//! `list` endpoint returns; each board's drawable content lives in its own
//! `<boardId>.json`. All I/O goes through `tokio::fs` so callers never block
//! the async runtime, and the registry is guarded by a `tokio::sync::Mutex`
//! so concurrent saves can't race each other's read-modify-write of
//! `registry.json`.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use whiteboard_protocol::board::{BoardData, BoardMetadata};

use crate::paths::StoreLayout;
use crate::{Result, StoreError};

pub struct BoardStore {
    layout: StoreLayout,
    registry_lock: Mutex<()>,
}

impl BoardStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            registry_lock: Mutex::new(()),
        }
    }

    async fn read_registry(&self) -> Result<Vec<BoardMetadata>> {
        match tokio::fs::read(self.layout.registry_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_registry(&self, entries: &[BoardMetadata]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(self.layout.registry_path(), bytes).await?;
        Ok(())
    }

    /// Snapshot a board's drawable state, idempotent on `boardId` when
    /// re-saving (the registry entry is replaced, not duplicated).
    pub async fn save(&self, name: &str, data: &BoardData, saved_by: &str) -> Result<String> {
        self.layout.ensure_dirs().await?;
        let board_id = Uuid::new_v4().to_string();
        let bytes = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(self.layout.board_path(&board_id), bytes).await?;

        let metadata = BoardMetadata {
            board_id: board_id.clone(),
            name: name.to_string(),
            saved_by: saved_by.to_string(),
            saved_at: Utc::now(),
            shape_count: data.shapes.len(),
        };

        let _guard = self.registry_lock.lock().await;
        let mut entries = self.read_registry().await?;
        entries.push(metadata);
        self.write_registry(&entries).await?;

        info!(board_id = %board_id, %name, %saved_by, "board saved");
        Ok(board_id)
    }

    pub async fn list(&self) -> Result<Vec<BoardMetadata>> {
        self.read_registry().await
    }

    pub async fn load(&self, board_id: &str) -> Result<BoardData> {
        let bytes = tokio::fs::read(self.layout.board_path(board_id))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StoreError::BoardNotFound(board_id.to_string()),
                _ => StoreError::Io(e),
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Deletes both the board file and its registry entry. Requires
    /// `requestor == savedBy` per the open-question decision in
    /// `SPEC_FULL.md` §9.1 — there is no admin override.
    pub async fn delete(&self, board_id: &str, requestor: &str) -> Result<()> {
        let _guard = self.registry_lock.lock().await;
        let mut entries = self.read_registry().await?;
        let Some(pos) = entries.iter().position(|b| b.board_id == board_id) else {
            return Err(StoreError::BoardNotFound(board_id.to_string()));
        };
        if entries[pos].saved_by != requestor {
            return Err(StoreError::NotOwner {
                board_id: board_id.to_string(),
                requestor: requestor.to_string(),
            });
        }
        entries.remove(pos);
        self.write_registry(&entries).await?;

        if let Err(e) = tokio::fs::remove_file(self.layout.board_path(board_id)).await {
            warn!(board_id = %board_id, error = %e, "board file already gone on delete");
        }
        info!(board_id = %board_id, %requestor, "board deleted");
        Ok(())
    }

    pub async fn export(&self, board_id: &str) -> Result<serde_json::Value> {
        let data = self.load(board_id).await?;
        Ok(serde_json::to_value(data)?)
    }

    pub async fn import(&self, name: &str, data: serde_json::Value, saved_by: &str) -> Result<String> {
        let board: BoardData = serde_json::from_value(data)?;
        self.save(name, &board, saved_by).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whiteboard_protocol::shape::{CommonShapeFields, Geometry, ShapeData};

    fn sample_board() -> BoardData {
        BoardData {
            shapes: vec![ShapeData::Rectangle(Geometry {
                common: CommonShapeFields {
                    id: "s1".into(),
                    x: 0.0,
                    y: 0.0,
                    color: "#000000".into(),
                    size: 1.0,
                    username: "alice".into(),
                    timestamp: 0,
                    fill_color: None,
                },
                width: Some(10.0),
                height: Some(10.0),
                radius: None,
            })],
            strokes: Vec::new(),
            eraser_strokes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BoardStore::new(StoreLayout::new(dir.path()));
        let board_id = store.save("My Board", &sample_board(), "alice").await.unwrap();
        let loaded = store.load(&board_id).await.unwrap();
        assert_eq!(loaded.shapes.len(), 1);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].saved_by, "alice");
    }

    #[tokio::test]
    async fn delete_rejects_non_owner() {
        let dir = tempfile::tempdir().unwrap();
        let store = BoardStore::new(StoreLayout::new(dir.path()));
        let board_id = store.save("Board", &sample_board(), "alice").await.unwrap();

        let err = store.delete(&board_id, "mallory").await.unwrap_err();
        assert!(matches!(err, StoreError::NotOwner { .. }));

        store.delete(&board_id, "alice").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_missing_board_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = BoardStore::new(StoreLayout::new(dir.path()));
        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::BoardNotFound(_)));
    }

    #[tokio::test]
    async fn export_then_import_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BoardStore::new(StoreLayout::new(dir.path()));
        let board_id = store.save("Board", &sample_board(), "alice").await.unwrap();
        let exported = store.export(&board_id).await.unwrap();

        let imported_id = store.import("Copy", exported, "bob").await.unwrap();
        assert_ne!(imported_id, board_id);
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
    }
}
