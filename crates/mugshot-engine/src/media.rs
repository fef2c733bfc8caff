//! Frame source seams. Camera capture and video file decode live
//! outside this crate; the pipeline and session only consume frames.

use image::RgbImage;
use std::path::Path;
use thiserror::Error;

/// Default target sampling rate for training videos, in frames per
/// second. Overridden via `MUGSHOT_VIDEO_SAMPLE_FPS`.
pub const DEFAULT_VIDEO_SAMPLE_FPS: f64 = 2.0;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("could not open: {0}")]
    Open(String),
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("video decoding is not available: {0}")]
    Unsupported(String),
}

/// A stream of RGB frames: a camera, or a decoded video file.
pub trait FrameSource: Send {
    /// Native frame rate of the source.
    fn fps(&self) -> f64;
    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, MediaError>;
}

/// Opens a video file as a [`FrameSource`] for training ingestion.
pub trait VideoOpener: Send {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, MediaError>;
}

/// Opener for hosts without a video decoder: every video file in the
/// corpus becomes a per-file error rather than aborting the run.
pub struct NoVideo;

impl VideoOpener for NoVideo {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, MediaError> {
        Err(MediaError::Unsupported(format!(
            "no video decoder for {}",
            path.display()
        )))
    }
}

/// Frame-index stride that samples a video at roughly `sample_fps`
/// frames per second: `max(1, round(fps / sample_fps))`. Degenerate
/// rates on either side (zero, negative, NaN) sample every frame.
pub fn sample_stride(fps: f64, sample_fps: f64) -> u64 {
    let stride = (fps / sample_fps).round();
    if stride.is_finite() && stride >= 1.0 {
        stride as u64
    } else {
        1
    }
}
