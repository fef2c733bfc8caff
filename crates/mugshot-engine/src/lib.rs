//! mugshot-engine — Enrollment pipeline, per-model runtime registry,
//! live recognition sessions, and the engine worker thread.
//!
//! The engine owns the mutable state: per-model gallery snapshots, the
//! single resident detector, and the processed-file ledgers. Front ends
//! talk to it over a request channel and only ever see immutable
//! gallery snapshots.

pub mod config;
pub mod media;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod stub;
pub mod worker;

pub use config::Config;
pub use media::{
    sample_stride, FrameSource, MediaError, NoVideo, VideoOpener, DEFAULT_VIDEO_SAMPLE_FPS,
};
pub use pipeline::{run_enroll, EnrollError, EnrollOptions, EnrollReport, FileError};
pub use registry::ModelRegistry;
pub use session::{start_session, SessionError, SessionEvent, SessionHandle};
pub use worker::{spawn_engine, EngineError, EngineHandle};
