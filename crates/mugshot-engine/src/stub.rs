//! Diagnostic oracles and in-memory frame sources.
//!
//! These are not face models: the detector treats any non-black image
//! as a single full-frame face, and the embedder encodes a 3x3 grid of
//! mean colors. They exist so the pipeline, session, and CLI can be
//! exercised end-to-end without any model weights installed
//! (`mugshot --stub-oracles ...`), and they back the integration tests.

use crate::media::{FrameSource, MediaError, VideoOpener};
use image::RgbImage;
use mugshot_core::{Embedding, FaceBox, FaceDetector, FaceEmbedder, OracleError};
use std::collections::HashMap;
use std::path::Path;

/// Mean-brightness floor below which a frame counts as blank (no face).
const BLANK_BRIGHTNESS: u64 = 10;

/// Reports one face covering the whole image, or none for a near-black
/// (blank) image.
pub struct StubDetector;

impl FaceDetector for StubDetector {
    fn detect_faces(&mut self, image: &RgbImage) -> Vec<FaceBox> {
        let pixels = (u64::from(image.width()) * u64::from(image.height())).max(1);
        let sum: u64 = image
            .pixels()
            .map(|p| p.0.iter().map(|&c| u64::from(c)).sum::<u64>())
            .sum();
        if sum / (pixels * 3) < BLANK_BRIGHTNESS {
            return Vec::new();
        }
        vec![FaceBox {
            top: 0,
            left: 0,
            right: i64::from(image.width()),
            bottom: i64::from(image.height()),
        }]
    }
}

/// Embeds a face region as a 3x3 grid of mean RGB values, each channel
/// scaled to [0, 1]. Identical crops embed at distance zero; similar
/// colors embed nearby.
pub struct GridEmbedder;

impl FaceEmbedder for GridEmbedder {
    fn embed(&mut self, image: &RgbImage, face: &FaceBox) -> Result<Embedding, OracleError> {
        let (w, h) = (i64::from(image.width()), i64::from(image.height()));
        let left = face.left.clamp(0, w);
        let right = face.right.clamp(0, w);
        let top = face.top.clamp(0, h);
        let bottom = face.bottom.clamp(0, h);
        if right <= left || bottom <= top {
            return Err(OracleError::Embedding("empty face region".to_string()));
        }

        let mut values = Vec::with_capacity(27);
        for gy in 0..3i64 {
            for gx in 0..3i64 {
                let x0 = left + (right - left) * gx / 3;
                let x1 = (left + (right - left) * (gx + 1) / 3).max(x0 + 1);
                let y0 = top + (bottom - top) * gy / 3;
                let y1 = (top + (bottom - top) * (gy + 1) / 3).max(y0 + 1);

                let mut sums = [0u64; 3];
                let mut count = 0u64;
                for y in y0..y1.min(h) {
                    for x in x0..x1.min(w) {
                        let pixel = image.get_pixel(x as u32, y as u32);
                        for (sum, &channel) in sums.iter_mut().zip(pixel.0.iter()) {
                            *sum += u64::from(channel);
                        }
                        count += 1;
                    }
                }
                for sum in sums {
                    let mean = if count > 0 { sum as f32 / count as f32 } else { 0.0 };
                    values.push(mean / 255.0);
                }
            }
        }
        Ok(Embedding::new(values))
    }
}

/// Fixed-rate, in-memory frame sequence.
pub struct FrameClip {
    fps: f64,
    frames: std::vec::IntoIter<RgbImage>,
}

impl FrameClip {
    pub fn new(fps: f64, frames: Vec<RgbImage>) -> Self {
        Self {
            fps,
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for FrameClip {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, MediaError> {
        Ok(self.frames.next())
    }
}

/// In-memory video "library": maps a corpus file name to a clip, so
/// tests can exercise video ingestion without a real decoder.
#[derive(Default)]
pub struct ClipLibrary {
    clips: HashMap<String, (f64, Vec<RgbImage>)>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: impl Into<String>, fps: f64, frames: Vec<RgbImage>) {
        self.clips.insert(file_name.into(), (fps, frames));
    }
}

impl VideoOpener for ClipLibrary {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, MediaError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.clips.get(&name) {
            Some((fps, frames)) => Ok(Box::new(FrameClip::new(*fps, frames.clone()))),
            None => Err(MediaError::Open(format!("no clip named {name}"))),
        }
    }
}
