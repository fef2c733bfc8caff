//! Per-model runtime context: published gallery snapshots, the single
//! resident detector, and identity removal across all models.
//!
//! Readers get whole-gallery `Arc` snapshots; a training run publishes
//! a replacement snapshot only after persisting it, so concurrent
//! recognition sees either the pre-training or post-training gallery in
//! full, never a partial one.

use mugshot_core::{
    normalize_label, DetectorRegistry, FaceDetector, Gallery, ModelKind, OracleError,
};
use mugshot_store::{load_gallery, load_ledger, save_gallery, save_ledger, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ModelRegistry {
    data_dir: PathBuf,
    detectors: DetectorRegistry,
    galleries: HashMap<ModelKind, Arc<Gallery>>,
    /// At most one detector is resident at a time. Some families are
    /// large enough that holding two concurrently risks exhausting
    /// memory, so switching kinds releases the old one first.
    resident: Option<(ModelKind, Box<dyn FaceDetector>)>,
}

impl ModelRegistry {
    pub fn new(data_dir: impl Into<PathBuf>, detectors: DetectorRegistry) -> Self {
        Self {
            data_dir: data_dir.into(),
            detectors,
            galleries: HashMap::new(),
            resident: None,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the persisted gallery for every known model. Called once at
    /// startup; corrupt or missing files degrade to empty galleries.
    pub fn load_all(&mut self) {
        for kind in ModelKind::ALL {
            let gallery = load_gallery(&self.data_dir, kind);
            if !gallery.is_empty() {
                tracing::info!(model = %kind, entries = gallery.len(),
                    identities = gallery.identity_count(), "gallery loaded");
            }
            self.galleries.insert(kind, Arc::new(gallery));
        }
    }

    /// Current gallery snapshot for a model. Cheap to clone; holders
    /// keep seeing the same snapshot until a new one is published.
    pub fn gallery(&self, kind: ModelKind) -> Arc<Gallery> {
        self.galleries
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(Gallery::new()))
    }

    /// Swap in a new gallery snapshot. Callers persist first.
    pub fn publish(&mut self, kind: ModelKind, gallery: Gallery) {
        self.galleries.insert(kind, Arc::new(gallery));
    }

    pub fn detector_available(&self, kind: ModelKind) -> bool {
        self.detectors.available(kind)
    }

    /// Take the detector for a model, constructing it lazily. A resident
    /// detector of a different kind is dropped before the new one is
    /// constructed. Callers hand the detector back with
    /// [`return_detector`](Self::return_detector) when done.
    pub fn checkout_detector(
        &mut self,
        kind: ModelKind,
    ) -> Result<Box<dyn FaceDetector>, OracleError> {
        match self.resident.take() {
            Some((resident_kind, detector)) if resident_kind == kind => Ok(detector),
            Some((resident_kind, detector)) => {
                drop(detector);
                tracing::info!(released = %resident_kind, loading = %kind,
                    "switching resident detector");
                self.detectors.construct(kind)
            }
            None => self.detectors.construct(kind),
        }
    }

    pub fn return_detector(&mut self, kind: ModelKind, detector: Box<dyn FaceDetector>) {
        self.resident = Some((kind, detector));
    }

    /// Remove an identity everywhere: gallery entries for every model,
    /// ledger entries under the identity's corpus subdirectory, and the
    /// source directory itself. Returns whether anything was removed.
    ///
    /// Callers hold the normalized label (the gallery form), while
    /// ledger keys and corpus directories carry the raw directory name,
    /// e.g. `Jane Doe` for label `Jane_Doe`. Both are matched through
    /// [`normalize_label`].
    pub fn remove_identity(
        &mut self,
        training_root: &Path,
        label: &str,
    ) -> Result<bool, StoreError> {
        let mut removed = false;
        let matches_label =
            |dir: &str| -> bool { dir == label || normalize_label(dir) == label };

        for kind in ModelKind::ALL {
            let snapshot = self.gallery(kind);
            let mut gallery = (*snapshot).clone();
            let dropped = gallery.remove_label(label);
            if dropped > 0 {
                save_gallery(&self.data_dir, kind, &gallery)?;
                self.publish(kind, gallery);
                tracing::info!(model = %kind, label, entries = dropped,
                    "identity removed from gallery");
                removed = true;
            }

            let mut ledger = load_ledger(&self.data_dir, kind);
            let before = ledger.len();
            ledger.retain(|key| match key.split_once('/') {
                Some((dir, _)) => !matches_label(dir),
                None => true,
            });
            if ledger.len() != before {
                save_ledger(&self.data_dir, kind, &ledger)?;
            }
        }

        if training_root.is_dir() {
            for entry in std::fs::read_dir(training_root)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                if matches_label(&entry.file_name().to_string_lossy()) {
                    let dir = entry.path();
                    std::fs::remove_dir_all(&dir)?;
                    tracing::info!(label, dir = %dir.display(),
                        "identity source directory removed");
                    removed = true;
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use mugshot_core::{Embedding, FaceBox};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Detector that tracks how many instances are alive and how many
    /// were ever constructed.
    struct CountingDetector {
        live: Arc<AtomicUsize>,
    }

    impl CountingDetector {
        fn new(live: Arc<AtomicUsize>, constructed: &Arc<AtomicUsize>) -> Self {
            live.fetch_add(1, Ordering::SeqCst);
            constructed.fetch_add(1, Ordering::SeqCst);
            Self { live }
        }
    }

    impl Drop for CountingDetector {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl FaceDetector for CountingDetector {
        fn detect_faces(&mut self, _image: &RgbImage) -> Vec<FaceBox> {
            Vec::new()
        }
    }

    fn counting_registry() -> (DetectorRegistry, [Arc<AtomicUsize>; 2], [Arc<AtomicUsize>; 2]) {
        let live = [Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0))];
        let constructed = [Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0))];
        let mut detectors = DetectorRegistry::new();
        for (i, kind) in [ModelKind::Yolov8, ModelKind::Yolov11].into_iter().enumerate() {
            let live = live[i].clone();
            let constructed = constructed[i].clone();
            detectors.register(kind, move || {
                Ok(Box::new(CountingDetector::new(live.clone(), &constructed)))
            });
        }
        (detectors, live, constructed)
    }

    #[test]
    fn test_checkout_reuses_resident_detector() {
        let dir = tempfile::tempdir().unwrap();
        let (detectors, _live, constructed) = counting_registry();
        let mut registry = ModelRegistry::new(dir.path(), detectors);

        let d = registry.checkout_detector(ModelKind::Yolov8).unwrap();
        registry.return_detector(ModelKind::Yolov8, d);
        let d = registry.checkout_detector(ModelKind::Yolov8).unwrap();
        registry.return_detector(ModelKind::Yolov8, d);

        assert_eq!(constructed[0].load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_switching_kind_releases_previous_detector() {
        let dir = tempfile::tempdir().unwrap();
        let (detectors, live, constructed) = counting_registry();
        let mut registry = ModelRegistry::new(dir.path(), detectors);

        let d = registry.checkout_detector(ModelKind::Yolov8).unwrap();
        registry.return_detector(ModelKind::Yolov8, d);
        assert_eq!(live[0].load(Ordering::SeqCst), 1);

        let d = registry.checkout_detector(ModelKind::Yolov11).unwrap();
        // The yolov8 instance was dropped before yolov11 was constructed.
        assert_eq!(live[0].load(Ordering::SeqCst), 0);
        assert_eq!(live[1].load(Ordering::SeqCst), 1);
        assert_eq!(constructed[1].load(Ordering::SeqCst), 1);
        registry.return_detector(ModelKind::Yolov11, d);
    }

    #[test]
    fn test_unregistered_detector_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::new(dir.path(), DetectorRegistry::new());
        assert!(!registry.detector_available(ModelKind::DeepFace));
        assert!(matches!(
            registry.checkout_detector(ModelKind::DeepFace),
            Err(OracleError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_publish_swaps_snapshot_and_old_snapshot_survives() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::new(dir.path(), DetectorRegistry::new());

        let old = registry.gallery(ModelKind::Yolov8);
        assert!(old.is_empty());

        let mut gallery = Gallery::new();
        gallery.push("alice", Embedding::new(vec![0.1]));
        registry.publish(ModelKind::Yolov8, gallery);

        // A holder of the old snapshot is unaffected by the publish.
        assert!(old.is_empty());
        assert_eq!(registry.gallery(ModelKind::Yolov8).len(), 1);
    }

    #[test]
    fn test_remove_identity_prunes_gallery_ledger_and_corpus_dir() {
        let data = tempfile::tempdir().unwrap();
        let corpus = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(corpus.path().join("Alice")).unwrap();
        std::fs::write(corpus.path().join("Alice/1.jpg"), b"x").unwrap();

        let mut gallery = Gallery::new();
        gallery.push("Alice", Embedding::new(vec![0.1]));
        gallery.push("Bob", Embedding::new(vec![0.2]));
        save_gallery(data.path(), ModelKind::Yolov8, &gallery).unwrap();

        let mut ledger = std::collections::BTreeSet::new();
        ledger.insert("Alice/1.jpg".to_string());
        ledger.insert("Bob/1.jpg".to_string());
        save_ledger(data.path(), ModelKind::Yolov8, &ledger).unwrap();

        let mut registry = ModelRegistry::new(data.path(), DetectorRegistry::new());
        registry.load_all();

        assert!(registry.remove_identity(corpus.path(), "Alice").unwrap());

        let gallery = load_gallery(data.path(), ModelKind::Yolov8);
        assert_eq!(gallery.identities(), vec![("Bob".to_string(), 1)]);
        let ledger = load_ledger(data.path(), ModelKind::Yolov8);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains("Bob/1.jpg"));
        assert!(!corpus.path().join("Alice").exists());

        // Published snapshot was updated too.
        assert_eq!(registry.gallery(ModelKind::Yolov8).identity_count(), 1);
    }

    #[test]
    fn test_remove_identity_matches_whitespace_directory_name() {
        // Corpus directory `Jane Doe` enrolls as label `Jane_Doe`, and
        // removal only ever sees the label.
        let data = tempfile::tempdir().unwrap();
        let corpus = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(corpus.path().join("Jane Doe")).unwrap();
        std::fs::write(corpus.path().join("Jane Doe/1.jpg"), b"x").unwrap();

        let mut gallery = Gallery::new();
        gallery.push("Jane_Doe", Embedding::new(vec![0.1]));
        save_gallery(data.path(), ModelKind::Yolov8, &gallery).unwrap();

        let mut ledger = std::collections::BTreeSet::new();
        ledger.insert("Jane Doe/1.jpg".to_string());
        save_ledger(data.path(), ModelKind::Yolov8, &ledger).unwrap();

        let mut registry = ModelRegistry::new(data.path(), DetectorRegistry::new());
        registry.load_all();

        assert!(registry.remove_identity(corpus.path(), "Jane_Doe").unwrap());
        assert!(!corpus.path().join("Jane Doe").exists());
        assert!(load_ledger(data.path(), ModelKind::Yolov8).is_empty());
        assert!(load_gallery(data.path(), ModelKind::Yolov8).is_empty());
    }

    #[test]
    fn test_remove_unknown_identity_is_false() {
        let data = tempfile::tempdir().unwrap();
        let corpus = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::new(data.path(), DetectorRegistry::new());
        registry.load_all();
        assert!(!registry.remove_identity(corpus.path(), "Nobody").unwrap());
    }
}
