//! Uploaded image storage (`spec.md` §4.8, steps 2-4).
//!
//! The multipart parse and the room/shape-index side effects are the
//! session layer's job (`whiteboard_server::http::boards`); this module only
//! owns writing the bytes to disk under a random name and probing their
//! pixel dimensions.

use uuid::Uuid;

use crate::paths::StoreLayout;
use crate::Result;

/// Falls back to this when the uploaded bytes don't decode as a known image
/// format, per `spec.md` §4.8 step 4.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (200, 200);

pub struct ImageStore {
    layout: StoreLayout,
}

pub struct StoredImage {
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl ImageStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Writes `bytes` under a random filename preserving `extension`, and
    /// probes its pixel dimensions. Binary-clean: `bytes` is never treated
    /// as text.
    pub async fn store(&self, bytes: &[u8], extension: &str) -> Result<StoredImage> {
        self.layout.ensure_dirs().await?;
        let filename = format!("{}.{}", Uuid::new_v4(), extension);

        let (width, height) = probe_dimensions(bytes).unwrap_or(FALLBACK_DIMENSIONS);

        tokio::fs::write(self.layout.image_path(&filename), bytes).await?;

        Ok(StoredImage {
            filename,
            width,
            height,
        })
    }

    pub fn image_path(&self, filename: &str) -> std::path::PathBuf {
        self.layout.image_path(filename)
    }
}

fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::load_from_memory(bytes).ok().map(|img| {
        use image::GenericImageView;
        img.dimensions()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fall_back_to_default_dimensions() {
        assert_eq!(probe_dimensions(b"not an image"), None);
    }

    #[tokio::test]
    async fn store_writes_file_with_fallback_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(StoreLayout::new(dir.path()));
        let stored = store.store(b"not an image", "png").await.unwrap();
        assert_eq!((stored.width, stored.height), FALLBACK_DIMENSIONS);
        assert!(store.image_path(&stored.filename).exists());
    }
}
