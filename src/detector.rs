//! The face detector collaborator.
//!
//! Landmark detection itself happens outside this crate. A detector is
//! anything implementing [`LandmarkDetector`]; the session holds it through a
//! [`DetectorHandle`] that is created once, loaded once, and then shared
//! read-only.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capture::ImageArtifact;
use crate::error::{Error, Result};
use crate::types::{BoundingBox, LandmarkSet};

/// Which kind of face description a detector produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Full 68-point landmark sets.
    Landmarks68,
    /// Face bounding boxes only.
    BoundingBox,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Landmarks68 => write!(f, "landmarks68"),
            DetectorKind::BoundingBox => write!(f, "bounding_box"),
        }
    }
}

/// One detected face, as reported by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceObservation {
    Landmarks(LandmarkSet),
    BoundingBox(BoundingBox),
}

impl FaceObservation {
    pub fn kind(&self) -> DetectorKind {
        match self {
            FaceObservation::Landmarks(_) => DetectorKind::Landmarks68,
            FaceObservation::BoundingBox(_) => DetectorKind::BoundingBox,
        }
    }
}

/// A pretrained face detector.
///
/// `load` is called once before any detection. Implementations that need to
/// remember they were loaded use interior mutability, since the detector is
/// shared behind an `Arc`.
pub trait LandmarkDetector: Send + Sync {
    /// Kind of observation this detector returns.
    fn kind(&self) -> DetectorKind;

    /// Load model weights.
    fn load(&self) -> Result<()> {
        Ok(())
    }

    /// Detect faces in `image` and return the first one, if any.
    fn detect_first_face(&self, image: &ImageArtifact) -> Result<Option<FaceObservation>>;
}

/// Shared owner of the process-wide detector.
#[derive(Clone)]
pub struct DetectorHandle {
    inner: Arc<dyn LandmarkDetector>,
}

impl DetectorHandle {
    pub fn new<D: LandmarkDetector + 'static>(detector: D) -> Self {
        Self {
            inner: Arc::new(detector),
        }
    }

    pub fn kind(&self) -> DetectorKind {
        self.inner.kind()
    }

    pub fn load(&self) -> Result<()> {
        self.inner.load()
    }

    pub fn detect_first_face(&self, image: &ImageArtifact) -> Result<Option<FaceObservation>> {
        self.inner.detect_first_face(image)
    }
}

impl fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorHandle")
            .field("kind", &self.kind())
            .finish()
    }
}

/// Detections recorded ahead of time, in the JSON layout
/// `{"detector": "landmarks68", "faces": [{"landmarks": [...]}, ...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub detector: DetectorKind,
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
}

/// A detector that replays a [`Recording`] for every image it is given.
#[derive(Debug)]
pub struct RecordedDetector {
    recording: Recording,
    loaded: AtomicBool,
}

impl RecordedDetector {
    pub fn new(detector: DetectorKind, faces: Vec<FaceObservation>) -> Self {
        Self {
            recording: Recording { detector, faces },
            loaded: AtomicBool::new(false),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let recording: Recording = serde_json::from_str(json)?;
        Ok(Self::new(recording.detector, recording.faces))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn num_faces(&self) -> usize {
        self.recording.faces.len()
    }
}

impl LandmarkDetector for RecordedDetector {
    fn kind(&self) -> DetectorKind {
        self.recording.detector
    }

    /// Fails if any recorded face does not match the declared detector kind.
    fn load(&self) -> Result<()> {
        if let Some(face) = self
            .recording
            .faces
            .iter()
            .find(|face| face.kind() != self.recording.detector)
        {
            return Err(Error::ModelLoad(format!(
                "recording declares {} but contains a {} face",
                self.recording.detector,
                face.kind()
            )));
        }
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    fn detect_first_face(&self, _image: &ImageArtifact) -> Result<Option<FaceObservation>> {
        if !self.loaded.load(Ordering::Acquire) {
            return Err(Error::Detector("detector used before load".into()));
        }
        Ok(self.recording.faces.first().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_json_layout() {
        let face: FaceObservation =
            serde_json::from_str(r#"{"bounding_box": {"x": 1, "y": 2, "width": 3, "height": 4}}"#)
                .unwrap();
        assert_eq!(
            face,
            FaceObservation::BoundingBox(BoundingBox::new(1.0, 2.0, 3.0, 4.0))
        );
        assert_eq!(face.kind(), DetectorKind::BoundingBox);
    }

    #[test]
    fn recording_returns_first_face_only() {
        let json = r#"{
            "detector": "bounding_box",
            "faces": [
                {"bounding_box": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"bounding_box": {"x": 50, "y": 50, "width": 20, "height": 20}}
            ]
        }"#;
        let detector = RecordedDetector::from_json(json).unwrap();
        assert_eq!(detector.num_faces(), 2);
        detector.load().unwrap();

        let face = detector
            .detect_first_face(&ImageArtifact::new(vec![0u8; 4]))
            .unwrap();
        assert_eq!(
            face,
            Some(FaceObservation::BoundingBox(BoundingBox::new(
                0.0, 0.0, 10.0, 10.0
            )))
        );
    }

    #[test]
    fn empty_recording_detects_nothing() {
        let detector = RecordedDetector::from_json(r#"{"detector": "landmarks68"}"#).unwrap();
        detector.load().unwrap();
        let face = detector
            .detect_first_face(&ImageArtifact::new(Vec::new()))
            .unwrap();
        assert!(face.is_none());
    }

    #[test]
    fn detect_before_load_fails() {
        let detector = RecordedDetector::new(DetectorKind::Landmarks68, Vec::new());
        assert!(matches!(
            detector.detect_first_face(&ImageArtifact::new(Vec::new())),
            Err(Error::Detector(_))
        ));
    }

    #[test]
    fn load_rejects_mixed_recording() {
        let detector = RecordedDetector::new(
            DetectorKind::Landmarks68,
            vec![FaceObservation::BoundingBox(BoundingBox::new(
                0.0, 0.0, 1.0, 1.0,
            ))],
        );
        assert!(matches!(detector.load(), Err(Error::ModelLoad(_))));
    }

    #[test]
    fn handle_is_shared() {
        let handle = DetectorHandle::new(RecordedDetector::new(DetectorKind::BoundingBox, Vec::new()));
        let other = handle.clone();
        assert_eq!(other.kind(), DetectorKind::BoundingBox);
        handle.load().unwrap();
        // Loading through one clone is visible through the other.
        assert!(other
            .detect_first_face(&ImageArtifact::new(Vec::new()))
            .unwrap()
            .is_none());
    }
}
