//! Enrollment pipeline: walk a training corpus, run the detection and
//! embedding oracles over every new file, and merge the results into
//! the model's persisted gallery and ledger.
//!
//! Per-file failures (undecodable image, no face, oracle error) are
//! collected into the report and never abort the batch. A file's
//! encodings are committed all-or-nothing: a failure partway through a
//! file contributes no entries.

use crate::media::{sample_stride, VideoOpener, DEFAULT_VIDEO_SAMPLE_FPS};
use crate::registry::ModelRegistry;
use mugshot_core::{
    normalize_label, Embedding, FaceDetector, FaceEmbedder, Gallery, ModelKind, OracleError,
};
use mugshot_store::{file_key, load_gallery, load_ledger, save_gallery, save_ledger, StoreError};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const IMAGE_EXTS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];
const VIDEO_EXTS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// How many failing file names to spell out in a report summary.
const SUMMARY_ERROR_FILES: usize = 5;

#[derive(Error, Debug)]
pub enum EnrollError {
    /// Detector family unavailable — a configuration error, raised
    /// before any file is touched.
    #[error(transparent)]
    Detector(#[from] OracleError),
    #[error("cannot read training corpus: {0}")]
    Corpus(#[from] std::io::Error),
    /// Nothing to persist: no faces found across the entire run,
    /// including any incremental baseline. Prior store and ledger are
    /// left untouched.
    #[error("no faces found in any training file ({failed_files} file(s) had errors)")]
    NoFacesFound { failed_files: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct EnrollOptions {
    pub kind: ModelKind,
    /// Preserve and extend the prior gallery (default). `false` means a
    /// full retrain: prior encodings and ledger for this model are
    /// discarded.
    pub incremental: bool,
    /// Target sampling rate for training videos, frames per second.
    pub video_sample_fps: f64,
}

impl EnrollOptions {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            incremental: true,
            video_sample_fps: DEFAULT_VIDEO_SAMPLE_FPS,
        }
    }

    pub fn full_retrain(kind: ModelKind) -> Self {
        Self {
            incremental: false,
            ..Self::new(kind)
        }
    }
}

/// One file that failed during a run.
#[derive(Debug, Clone)]
pub struct FileError {
    /// Ledger key of the file (relative to the corpus root).
    pub file: String,
    pub reason: String,
}

/// Outcome of an enrollment run.
#[derive(Debug, Clone, Default)]
pub struct EnrollReport {
    /// Files ingested this run.
    pub new_files: usize,
    /// Files skipped because their ledger key was already present.
    pub skipped: usize,
    /// Gallery entries after the run, including any incremental baseline.
    pub total_encodings: usize,
    /// Distinct identities after the run.
    pub identities: usize,
    pub errors: Vec<FileError>,
}

impl EnrollReport {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Human-readable summary: counts plus the first few failing files,
    /// the remainder summarized by count.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} new file(s) processed, {} skipped, {} encoding(s), {} identit{}",
            self.new_files,
            self.skipped,
            self.total_encodings,
            self.identities,
            if self.identities == 1 { "y" } else { "ies" },
        );
        if !self.errors.is_empty() {
            out.push_str(&format!("\n{} file(s) had issues:", self.errors.len()));
            for err in self.errors.iter().take(SUMMARY_ERROR_FILES) {
                out.push_str(&format!("\n  {} ({})", err.file, err.reason));
            }
            if self.errors.len() > SUMMARY_ERROR_FILES {
                out.push_str(&format!(
                    "\n  ... and {} more",
                    self.errors.len() - SUMMARY_ERROR_FILES
                ));
            }
        }
        out
    }
}

struct Candidate {
    path: PathBuf,
    key: String,
    label: String,
    video: bool,
}

/// Enumerate corpus files two levels deep (`{identity}/{file}`),
/// filtered to known image and video extensions, in deterministic
/// (ledger-key) order.
fn collect_candidates(root: &Path) -> Result<Vec<Candidate>, EnrollError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let label = normalize_label(&entry.file_name().to_string_lossy());
        if label.is_empty() {
            continue;
        }
        for file in fs::read_dir(entry.path())? {
            let file = file?;
            if !file.file_type()?.is_file() {
                continue;
            }
            let path = file.path();
            let Some(ext) = path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
            else {
                continue;
            };
            let video = VIDEO_EXTS.contains(&ext.as_str());
            if !video && !IMAGE_EXTS.contains(&ext.as_str()) {
                continue;
            }
            out.push(Candidate {
                key: file_key(root, &path),
                label: label.clone(),
                path,
                video,
            });
        }
    }
    out.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(out)
}

/// Run one enrollment pass over the corpus for the given model.
///
/// Incremental runs seed from the persisted gallery and skip files
/// already in the ledger. Persistence order is gallery before ledger:
/// a crash between the two at worst re-processes files whose encodings
/// were already stored.
pub fn run_enroll(
    registry: &mut ModelRegistry,
    embedder: &mut dyn FaceEmbedder,
    video: &dyn VideoOpener,
    root: &Path,
    opts: &EnrollOptions,
) -> Result<EnrollReport, EnrollError> {
    let kind = opts.kind;
    tracing::info!(model = %kind, root = %root.display(), incremental = opts.incremental,
        "enrollment started");

    // Availability is a configuration error; fail before touching files.
    let mut detector = registry.checkout_detector(kind)?;

    let data_dir = registry.data_dir().to_path_buf();
    let (mut gallery, mut ledger) = if opts.incremental {
        (load_gallery(&data_dir, kind), load_ledger(&data_dir, kind))
    } else {
        (Gallery::new(), BTreeSet::new())
    };

    let candidates = collect_candidates(root)?;
    let mut report = EnrollReport::default();

    for cand in &candidates {
        if opts.incremental && ledger.contains(&cand.key) {
            report.skipped += 1;
            continue;
        }
        let outcome = if cand.video {
            ingest_video(
                detector.as_mut(),
                embedder,
                video,
                cand,
                opts.video_sample_fps,
                &mut gallery,
            )
        } else {
            ingest_image(detector.as_mut(), embedder, cand, &mut gallery)
        };
        match outcome {
            Ok(added) => {
                report.new_files += 1;
                ledger.insert(cand.key.clone());
                tracing::debug!(file = %cand.key, encodings = added, "file enrolled");
            }
            Err(reason) => {
                tracing::warn!(file = %cand.key, %reason, "file skipped");
                report.errors.push(FileError {
                    file: cand.key.clone(),
                    reason,
                });
            }
        }
    }

    registry.return_detector(kind, detector);

    if gallery.is_empty() {
        return Err(EnrollError::NoFacesFound {
            failed_files: report.errors.len(),
        });
    }

    report.total_encodings = gallery.len();
    report.identities = gallery.identity_count();

    if report.new_files > 0 || !opts.incremental {
        save_gallery(&data_dir, kind, &gallery)?;
        save_ledger(&data_dir, kind, &ledger)?;
        registry.publish(kind, gallery);
    }

    tracing::info!(model = %kind, new_files = report.new_files, skipped = report.skipped,
        encodings = report.total_encodings, identities = report.identities,
        errors = report.errors.len(), "enrollment finished");
    Ok(report)
}

fn ingest_image(
    detector: &mut dyn FaceDetector,
    embedder: &mut dyn FaceEmbedder,
    cand: &Candidate,
    gallery: &mut Gallery,
) -> Result<usize, String> {
    let img = image::open(&cand.path)
        .map_err(|e| format!("decode failed: {e}"))?
        .to_rgb8();

    let faces = detector.detect_faces(&img);
    if faces.is_empty() {
        return Err("no face detected".to_string());
    }

    let mut pending = Vec::with_capacity(faces.len());
    for face in &faces {
        let encoding = embedder
            .embed(&img, face)
            .map_err(|e| format!("encoding failed: {e}"))?;
        pending.push(encoding);
    }

    Ok(commit(gallery, &cand.label, pending))
}

fn ingest_video(
    detector: &mut dyn FaceDetector,
    embedder: &mut dyn FaceEmbedder,
    opener: &dyn VideoOpener,
    cand: &Candidate,
    sample_fps: f64,
    gallery: &mut Gallery,
) -> Result<usize, String> {
    let mut source = opener
        .open(&cand.path)
        .map_err(|e| format!("could not open: {e}"))?;
    let stride = sample_stride(source.fps(), sample_fps);

    let mut pending: Vec<Embedding> = Vec::new();
    let mut frames_with_faces = 0usize;
    let mut index: u64 = 0;
    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => return Err(format!("decode failed: {e}")),
        };
        if index % stride == 0 {
            let faces = detector.detect_faces(&frame);
            if !faces.is_empty() {
                for face in &faces {
                    let encoding = embedder
                        .embed(&frame, face)
                        .map_err(|e| format!("encoding failed: {e}"))?;
                    pending.push(encoding);
                }
                frames_with_faces += 1;
            }
        }
        index += 1;
    }

    // A video only enters the ledger if at least one sampled frame
    // yielded at least one face.
    if frames_with_faces == 0 {
        return Err("no faces in video".to_string());
    }
    Ok(commit(gallery, &cand.label, pending))
}

fn commit(gallery: &mut Gallery, label: &str, encodings: Vec<Embedding>) -> usize {
    let added = encodings.len();
    for encoding in encodings {
        gallery.push(label, encoding);
    }
    added
}
