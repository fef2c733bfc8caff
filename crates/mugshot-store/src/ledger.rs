//! Processed-file ledger: `ledger_{model}.json`, a serialized set of
//! relative file identifiers already ingested for that model.

use crate::StoreError;
use mugshot_core::ModelKind;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

pub fn ledger_path(data_dir: &Path, kind: ModelKind) -> PathBuf {
    data_dir.join(format!("ledger_{kind}.json"))
}

/// Canonical ledger identifier for a corpus file: the path relative to
/// the training root, components joined with `/` on every platform,
/// case-sensitive.
pub fn file_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    // On the fallback (absolute) path, root and drive-prefix components
    // would render as empty or `C:` segments; keep only real names.
    rel.components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Load the ledger for a model. Same tolerant semantics as gallery
/// loading: missing or corrupt means empty, with a warning.
pub fn load_ledger(data_dir: &Path, kind: ModelKind) -> BTreeSet<String> {
    let path = ledger_path(data_dir, kind);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeSet::new(),
        Err(e) => {
            tracing::warn!(model = %kind, path = %path.display(), error = %e,
                "ledger unreadable; starting empty");
            return BTreeSet::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(model = %kind, path = %path.display(), error = %e,
                "ledger corrupt; starting empty");
            BTreeSet::new()
        }
    }
}

/// Persist the ledger for a model, full overwrite, atomically.
pub fn save_ledger(
    data_dir: &Path,
    kind: ModelKind,
    ids: &BTreeSet<String>,
) -> Result<(), StoreError> {
    let path = ledger_path(data_dir, kind);
    let bytes = serde_json::to_vec(ids)?;
    crate::write_atomic(&path, &bytes)?;
    tracing::debug!(model = %kind, entries = ids.len(), path = %path.display(),
        "ledger saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key_uses_forward_slashes() {
        let root = Path::new("/corpus");
        let path = Path::new("/corpus/Jane_Doe/photo 1.jpg");
        assert_eq!(file_key(root, path), "Jane_Doe/photo 1.jpg");
    }

    #[test]
    fn test_file_key_outside_root_falls_back_to_full_path() {
        let root = Path::new("/corpus");
        let path = Path::new("/elsewhere/x.jpg");
        assert_eq!(file_key(root, path), "elsewhere/x.jpg");
    }

    #[test]
    fn test_missing_ledger_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_ledger(dir.path(), ModelKind::DeepFace).is_empty());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut ids = BTreeSet::new();
        ids.insert("alice/1.jpg".to_string());
        ids.insert("bob/clip.mp4".to_string());
        save_ledger(dir.path(), ModelKind::Yolov11, &ids).unwrap();

        let back = load_ledger(dir.path(), ModelKind::Yolov11);
        assert_eq!(back, ids);
    }

    #[test]
    fn test_corrupt_ledger_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger_path(dir.path(), ModelKind::Yolov8);
        std::fs::write(&path, b"[\"alice/1.jp").unwrap();
        assert!(load_ledger(dir.path(), ModelKind::Yolov8).is_empty());
    }

    #[test]
    fn test_set_semantics_no_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut ids = BTreeSet::new();
        ids.insert("alice/1.jpg".to_string());
        ids.insert("alice/1.jpg".to_string());
        save_ledger(dir.path(), ModelKind::Yolov8, &ids).unwrap();
        assert_eq!(load_ledger(dir.path(), ModelKind::Yolov8).len(), 1);
    }
}
