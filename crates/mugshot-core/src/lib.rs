//! mugshot-core — Face enrollment and recognition primitives.
//!
//! Domain types (bounding boxes, embeddings, model families), the
//! in-memory encoding gallery, the weighted-vote recognition engine,
//! and the oracle traits behind which the actual detection and
//! embedding models live.

pub mod gallery;
pub mod matcher;
pub mod oracle;
pub mod types;

pub use gallery::Gallery;
pub use matcher::{identify, Match, MatchError, MATCH_THRESHOLD};
pub use oracle::{DetectorRegistry, FaceDetector, FaceEmbedder, OracleError};
pub use types::{normalize_label, Embedding, FaceBox, ModelKind};
