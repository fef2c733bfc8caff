use crate::media::DEFAULT_VIDEO_SAMPLE_FPS;
use mugshot_core::{ModelKind, MATCH_THRESHOLD};
use std::path::PathBuf;

/// Runtime configuration, loaded from environment variables.
pub struct Config {
    /// Directory holding the per-model gallery and ledger files.
    pub data_dir: PathBuf,
    /// Training corpus root: one subdirectory per identity.
    pub training_dir: PathBuf,
    /// Default active detection model family.
    pub model: ModelKind,
    /// Euclidean distance threshold for a positive match.
    pub match_threshold: f32,
    /// Run detection+recognition only on every Nth live frame.
    pub detect_every: u64,
    /// Target sampling rate for training videos, frames per second.
    pub video_sample_fps: f64,
}

impl Config {
    /// Load configuration from `MUGSHOT_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            data_dir: env_path("MUGSHOT_DATA_DIR", "output"),
            training_dir: env_path("MUGSHOT_TRAINING_DIR", "training"),
            model: std::env::var("MUGSHOT_MODEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(ModelKind::Yolov8),
            match_threshold: env_f32("MUGSHOT_MATCH_THRESHOLD", MATCH_THRESHOLD),
            detect_every: env_u64("MUGSHOT_DETECT_EVERY", 3),
            video_sample_fps: env_f64("MUGSHOT_VIDEO_SAMPLE_FPS", DEFAULT_VIDEO_SAMPLE_FPS),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
