//! Gallery (encoding store) files: `gallery_{model}.json`.

use crate::StoreError;
use mugshot_core::{Gallery, ModelKind};
use std::path::{Path, PathBuf};

pub fn gallery_path(data_dir: &Path, kind: ModelKind) -> PathBuf {
    data_dir.join(format!("gallery_{kind}.json"))
}

/// Load the persisted gallery for a model.
///
/// A missing file yields an empty gallery; an unreadable or corrupt file
/// (including a torn write or mismatched parallel sequences) also yields
/// an empty gallery with a warning. Never fails.
pub fn load_gallery(data_dir: &Path, kind: ModelKind) -> Gallery {
    let path = gallery_path(data_dir, kind);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Gallery::new(),
        Err(e) => {
            tracing::warn!(model = %kind, path = %path.display(), error = %e,
                "gallery unreadable; starting empty");
            return Gallery::new();
        }
    };

    match serde_json::from_slice::<Gallery>(&bytes) {
        Ok(gallery) if gallery.is_consistent() => gallery,
        Ok(_) => {
            tracing::warn!(model = %kind, path = %path.display(),
                "gallery has mismatched name/encoding lengths; starting empty");
            Gallery::new()
        }
        Err(e) => {
            tracing::warn!(model = %kind, path = %path.display(), error = %e,
                "gallery corrupt; starting empty");
            Gallery::new()
        }
    }
}

/// Persist the gallery for a model, full overwrite, atomically.
pub fn save_gallery(data_dir: &Path, kind: ModelKind, gallery: &Gallery) -> Result<(), StoreError> {
    let path = gallery_path(data_dir, kind);
    let bytes = serde_json::to_vec(gallery)?;
    crate::write_atomic(&path, &bytes)?;
    tracing::debug!(model = %kind, entries = gallery.len(), path = %path.display(),
        "gallery saved");
    Ok(())
}
