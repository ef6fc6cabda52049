//! Layout of the on-disk board store (`spec.md` §6, "Persisted state layout").
//!
//! Everything lives under one configurable base directory:
//!
//! ```text
//! <base>/saved_boards/<boardId>.json
//! <base>/saved_boards/registry.json
//! <base>/saved_boards/images/<uuid>.<ext>
//! <base>/saved_boards/timelapses/<jobId>.mp4
//! <base>/credentials.sqlite3
//! ```

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StoreLayout {
    base_dir: PathBuf,
}

impl StoreLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn boards_dir(&self) -> PathBuf {
        self.base_dir.join("saved_boards")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.boards_dir().join("registry.json")
    }

    pub fn board_path(&self, board_id: &str) -> PathBuf {
        self.boards_dir().join(format!("{board_id}.json"))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.boards_dir().join("images")
    }

    pub fn image_path(&self, filename: &str) -> PathBuf {
        self.images_dir().join(filename)
    }

    pub fn timelapses_dir(&self) -> PathBuf {
        self.boards_dir().join("timelapses")
    }

    pub fn timelapse_video_path(&self, job_id: &str) -> PathBuf {
        self.timelapses_dir().join(format!("{job_id}.mp4"))
    }

    pub fn credentials_db_path(&self) -> PathBuf {
        self.base_dir.join("credentials.sqlite3")
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.boards_dir()).await?;
        tokio::fs::create_dir_all(self.images_dir()).await?;
        tokio::fs::create_dir_all(self.timelapses_dir()).await?;
        Ok(())
    }
}

/// Rejects any filename containing `..`, `/`, or `\` — the `spec.md` §4.8
/// rule applied uniformly to both the upload write path and the static
/// `GET /images/<filename>` read path.
pub fn is_safe_filename(name: &str) -> bool {
    !name.contains("..") && !name.contains('/') && !name.contains('\\')
}

/// Best-effort content-type lookup for the static image GET route.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_filenames() {
        assert!(!is_safe_filename("../etc/passwd"));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename("a\\b.png"));
        assert!(is_safe_filename("img-9f3c.png"));
    }

    #[test]
    fn layout_paths_nest_under_base() {
        let layout = StoreLayout::new("/srv/whiteboard");
        assert_eq!(
            layout.board_path("b1"),
            PathBuf::from("/srv/whiteboard/saved_boards/b1.json")
        );
        assert_eq!(
            layout.image_path("x.png"),
            PathBuf::from("/srv/whiteboard/saved_boards/images/x.png")
        );
    }

    #[test]
    fn content_type_matches_extension() {
        assert_eq!(content_type_for(Path::new("a.png")), "image/png");
        assert_eq!(content_type_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
