//! Oracle seams for the pluggable detection and embedding models, plus
//! the capability registry that maps a model family to a detector
//! factory. Families that are not installed simply fail to construct
//! with a typed unavailable error.

use crate::types::{Embedding, FaceBox, ModelKind};
use image::RgbImage;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    /// The requested model family cannot be constructed on this host.
    /// Surfaced before any file work begins, never as a per-file error.
    #[error("{model} detector is not available: {reason}")]
    Unavailable { model: ModelKind, reason: String },
    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// Face detection oracle. One implementation per model family.
///
/// Must not fail for a well-formed image: no faces means an empty list.
pub trait FaceDetector: Send {
    fn detect_faces(&mut self, image: &RgbImage) -> Vec<FaceBox>;
}

/// Face embedding oracle: a fixed-length vector per detected face box.
/// Invoked once per box returned by the detector for the same image.
pub trait FaceEmbedder: Send {
    fn embed(&mut self, image: &RgbImage, face: &FaceBox) -> Result<Embedding, OracleError>;
}

type DetectorFactory = Box<dyn Fn() -> Result<Box<dyn FaceDetector>, OracleError> + Send>;

/// Capability registry: model family → detector factory.
///
/// Host applications register the families they ship; unregistered
/// kinds construct to [`OracleError::Unavailable`].
#[derive(Default)]
pub struct DetectorRegistry {
    factories: HashMap<ModelKind, DetectorFactory>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: ModelKind, factory: F)
    where
        F: Fn() -> Result<Box<dyn FaceDetector>, OracleError> + Send + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    pub fn available(&self, kind: ModelKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Construct a fresh detector for the given family.
    pub fn construct(&self, kind: ModelKind) -> Result<Box<dyn FaceDetector>, OracleError> {
        match self.factories.get(&kind) {
            Some(factory) => {
                let detector = factory()?;
                tracing::info!(model = %kind, "detector constructed");
                Ok(detector)
            }
            None => Err(OracleError::Unavailable {
                model: kind,
                reason: "no detector registered for this model family".to_string(),
            }),
        }
    }
}
