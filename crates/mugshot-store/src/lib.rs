//! mugshot-store — Persistence for per-model encoding galleries and
//! processed-file ledgers.
//!
//! One gallery file and one ledger file per detection model, under a
//! single data directory. Reads are tolerant: a missing, torn, or
//! corrupt file degrades to an empty store with a warning, never an
//! error. Writes go to a temp file first, then rename over the target,
//! so a crash mid-write leaves the previous valid file intact.

pub mod gallery_io;
pub mod ledger;

pub use gallery_io::{gallery_path, load_gallery, save_gallery};
pub use ledger::{file_key, ledger_path, load_ledger, save_ledger};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Write bytes to `path` atomically: temp file in the same directory,
/// then rename over the target.
pub(crate) fn write_atomic(path: &std::path::Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
