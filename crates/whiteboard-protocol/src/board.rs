//! Board persistence DTOs — the shapes exchanged with the HTTP control
//! plane's save/load/list/export/import endpoints (`spec.md` §4.7, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shape::{ShapeData, StrokeDelta};

/// One row of `GET /api/boards/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardMetadata {
    pub board_id: String,
    pub name: String,
    pub saved_by: String,
    pub saved_at: DateTime<Utc>,
    pub shape_count: usize,
}

/// A saved board's drawable content — what `load`/`export` return and
/// `save`/`import` accept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoardData {
    #[serde(default)]
    pub shapes: Vec<ShapeData>,
    #[serde(default)]
    pub strokes: Vec<StrokeDelta>,
    #[serde(default)]
    pub eraser_strokes: Vec<StrokeDelta>,
}

/// Status of a timelapse render job (`spec.md` §4.7, §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimelapseStatus {
    Queued,
    Rendering,
    Done,
    Failed,
}
