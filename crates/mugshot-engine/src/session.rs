//! Live recognition session: pull frames from a source on a dedicated
//! thread, run detect+embed+identify on every Nth frame, and post
//! annotated results to the interactive surface over a channel.
//!
//! Intervening frames re-emit the previous results (`fresh = false`),
//! so boxes look sticky for up to N-1 frames — an accepted
//! latency/CPU trade-off.

use crate::media::FrameSource;
use image::RgbImage;
use mugshot_core::{identify, FaceBox, FaceDetector, FaceEmbedder, Gallery};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Poll interval while the event channel is full. The loop rechecks the
/// stop flag between attempts so `stop()` never waits on a stalled
/// consumer.
const SEND_RETRY: Duration = Duration::from_millis(5);

#[derive(Error, Debug)]
pub enum SessionError {
    /// The gallery for the active model is empty; a session cannot
    /// start without trained data.
    #[error("no trained data for the active model")]
    NoTrainedData,
}

/// One annotated frame posted to the interactive surface.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub frame_index: u64,
    /// Detected faces with the recognized label, `None` for no match.
    pub faces: Vec<(FaceBox, Option<String>)>,
    /// Whether detection ran on this frame or the results are reused
    /// from the last detected frame.
    pub fresh: bool,
}

/// Handle to a running session. Dropping it stops the session.
pub struct SessionHandle {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Stop the session: signal the loop, join the thread (which stops
    /// the frame pull), after which the frame source is dropped and the
    /// capture device released. Safe to call more than once.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start a live recognition session over the given frame source.
///
/// The gallery snapshot is fixed for the session's lifetime; a training
/// run that completes meanwhile publishes a new snapshot that only the
/// next session will see.
pub fn start_session(
    mut source: Box<dyn FrameSource>,
    mut detector: Box<dyn FaceDetector>,
    mut embedder: Box<dyn FaceEmbedder>,
    gallery: Arc<Gallery>,
    threshold: f32,
    detect_every: u64,
    events: mpsc::Sender<SessionEvent>,
) -> Result<SessionHandle, SessionError> {
    if gallery.is_empty() {
        return Err(SessionError::NoTrainedData);
    }
    let detect_every = detect_every.max(1);

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();

    let join = std::thread::Builder::new()
        .name("mugshot-session".into())
        .spawn(move || {
            let mut last: Vec<(FaceBox, Option<String>)> = Vec::new();
            let mut index: u64 = 0;
            'frames: while flag.load(Ordering::SeqCst) {
                let frame = match source.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "frame capture failed; stopping session");
                        break;
                    }
                };

                let fresh = index % detect_every == 0;
                if fresh {
                    last = annotate(
                        &frame,
                        detector.as_mut(),
                        embedder.as_mut(),
                        &gallery,
                        threshold,
                    );
                }

                let mut event = SessionEvent {
                    frame_index: index,
                    faces: last.clone(),
                    fresh,
                };
                loop {
                    if !flag.load(Ordering::SeqCst) {
                        break 'frames;
                    }
                    match events.try_send(event) {
                        Ok(()) => break,
                        Err(TrySendError::Full(back)) => {
                            event = back;
                            std::thread::sleep(SEND_RETRY);
                        }
                        // Interactive surface went away.
                        Err(TrySendError::Closed(_)) => break 'frames,
                    }
                }
                index += 1;
            }
            // `source` drops here: the capture device is released only
            // after the frame-pull loop has stopped.
            drop(source);
            tracing::debug!("session loop exited");
        })
        .expect("failed to spawn session thread");

    Ok(SessionHandle {
        running,
        join: Some(join),
    })
}

fn annotate(
    frame: &RgbImage,
    detector: &mut dyn FaceDetector,
    embedder: &mut dyn FaceEmbedder,
    gallery: &Gallery,
    threshold: f32,
) -> Vec<(FaceBox, Option<String>)> {
    detector
        .detect_faces(frame)
        .into_iter()
        .map(|face| {
            let label = match embedder.embed(frame, &face) {
                Ok(probe) => match identify(&probe, gallery, threshold) {
                    Ok(Some(m)) => Some(m.label),
                    // Gallery emptiness was checked at session start.
                    Ok(None) | Err(_) => None,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "per-frame embedding failed");
                    None
                }
            };
            (face, label)
        })
        .collect()
}
