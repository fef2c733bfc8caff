use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Detection model family. Each kind gets its own encoding gallery and
/// processed-file ledger on disk; encodings are never shared across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Yolov8,
    Yolov11,
    RetinaFace,
    DeepFace,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Yolov8,
        ModelKind::Yolov11,
        ModelKind::RetinaFace,
        ModelKind::DeepFace,
    ];

    /// Stable lowercase name, used in persisted file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Yolov8 => "yolov8",
            ModelKind::Yolov11 => "yolov11",
            ModelKind::RetinaFace => "retinaface",
            ModelKind::DeepFace => "deepface",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yolov8" => Ok(ModelKind::Yolov8),
            "yolov11" => Ok(ModelKind::Yolov11),
            "retinaface" => Ok(ModelKind::RetinaFace),
            "deepface" => Ok(ModelKind::DeepFace),
            _ => Err(UnknownModel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown model family: {0} (expected yolov8, yolov11, retinaface, or deepface)")]
pub struct UnknownModel(pub String);

/// Pixel bounding box for a detected face, in (top, right, bottom, left)
/// order as produced by the detection oracles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub left: i64,
}

impl FaceBox {
    pub fn width(&self) -> i64 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.bottom - self.top).max(0)
    }
}

/// Face embedding vector produced by the embedding oracle.
///
/// The dimension is oracle-defined and treated opaquely here; comparing
/// embeddings from different oracles is the caller's mistake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance. Lower = more similar, 0 = identical.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Derive an identity label from a corpus directory name: trimmed, with
/// whitespace runs collapsed to a single underscore.
pub fn normalize_label(dir_name: &str) -> String {
    dir_name.trim().split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parse_case_insensitive() {
        assert_eq!("YOLOv8".parse::<ModelKind>().unwrap(), ModelKind::Yolov8);
        assert_eq!("retinaface".parse::<ModelKind>().unwrap(), ModelKind::RetinaFace);
        assert!("dlib".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_model_kind_roundtrip_via_str() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.as_str().parse::<ModelKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Embedding::new(vec![0.3, -0.1, 0.5]);
        assert_eq!(a.euclidean_distance(&a), 0.0);
    }

    #[test]
    fn test_euclidean_distance_unit_apart() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Jane Doe"), "Jane_Doe");
        assert_eq!(normalize_label("  John   Q  Public "), "John_Q_Public");
        assert_eq!(normalize_label("solo"), "solo");
    }

    #[test]
    fn test_face_box_dimensions() {
        let b = FaceBox { top: 10, right: 50, bottom: 40, left: 20 };
        assert_eq!(b.width(), 30);
        assert_eq!(b.height(), 30);
    }
}
