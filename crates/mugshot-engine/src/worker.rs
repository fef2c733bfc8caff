//! Engine worker thread. All mutable state (registry, resident
//! detector, galleries) lives on one dedicated OS thread; front ends
//! hold a clone-safe handle and talk to it over a request channel with
//! oneshot replies. The single thread also serializes enrollment runs:
//! at most one is ever in flight per process.

use crate::media::VideoOpener;
use crate::pipeline::{run_enroll, EnrollError, EnrollOptions, EnrollReport};
use crate::registry::ModelRegistry;
use mugshot_core::{identify, Embedding, FaceEmbedder, Gallery, Match, MatchError, ModelKind};
use mugshot_store::StoreError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Enroll(#[from] EnrollError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("engine thread exited")]
    ChannelClosed,
}

enum EngineRequest {
    Enroll {
        root: PathBuf,
        opts: EnrollOptions,
        reply: oneshot::Sender<Result<EnrollReport, EnrollError>>,
    },
    Recognize {
        probe: Embedding,
        kind: ModelKind,
        threshold: f32,
        reply: oneshot::Sender<Result<Option<Match>, MatchError>>,
    },
    RemoveIdentity {
        root: PathBuf,
        label: String,
        reply: oneshot::Sender<Result<bool, StoreError>>,
    },
    Gallery {
        kind: ModelKind,
        reply: oneshot::Sender<Arc<Gallery>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run an enrollment pass over the corpus at `root`.
    pub async fn enroll(
        &self,
        root: PathBuf,
        opts: EnrollOptions,
    ) -> Result<EnrollReport, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Enroll {
                root,
                opts,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }

    /// Identify a probe embedding against the model's current gallery.
    pub async fn recognize(
        &self,
        probe: Embedding,
        kind: ModelKind,
        threshold: f32,
    ) -> Result<Option<Match>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Recognize {
                probe,
                kind,
                threshold,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }

    /// Remove an identity from every model's gallery and ledger, and
    /// delete its corpus directory.
    pub async fn remove_identity(
        &self,
        root: PathBuf,
        label: String,
    ) -> Result<bool, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::RemoveIdentity {
                root,
                label,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }

    /// Current gallery snapshot for a model.
    pub async fn gallery(&self, kind: ModelKind) -> Result<Arc<Gallery>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Gallery {
                kind,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Loads every model's persisted gallery, then enters the request loop.
pub fn spawn_engine(
    mut registry: ModelRegistry,
    mut embedder: Box<dyn FaceEmbedder>,
    video: Box<dyn VideoOpener>,
) -> EngineHandle {
    registry.load_all();

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("mugshot-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Enroll { root, opts, reply } => {
                        let result = run_enroll(
                            &mut registry,
                            embedder.as_mut(),
                            video.as_ref(),
                            &root,
                            &opts,
                        );
                        let _ = reply.send(result);
                    }
                    EngineRequest::Recognize {
                        probe,
                        kind,
                        threshold,
                        reply,
                    } => {
                        let gallery = registry.gallery(kind);
                        let _ = reply.send(identify(&probe, &gallery, threshold));
                    }
                    EngineRequest::RemoveIdentity { root, label, reply } => {
                        let _ = reply.send(registry.remove_identity(&root, &label));
                    }
                    EngineRequest::Gallery { kind, reply } => {
                        let _ = reply.send(registry.gallery(kind));
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    EngineHandle { tx }
}
