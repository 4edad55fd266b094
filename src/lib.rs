//! # golden-face
//!
//! Golden-ratio facial proportion scoring from detected face landmarks.
//!
//! This crate provides:
//! - **Measurements**: vertical brow/eye/nose/chin distances from 68-point landmarks
//! - **Scoring**: golden-ratio scores, with a second formula for detectors that
//!   only report a face bounding box
//! - **Sessions**: a capture-to-score state machine driving an external detector
//!
//! Face detection is not part of this crate. Plug a detector in by
//! implementing [`LandmarkDetector`].
//!
//! ## Scoring
//!
//! For 68-point landmarks the score is
//!
//! ```text
//! ((brow_to_eyes + eyes_to_nose) / nose_to_chin) * PHI + eyes_to_nose / brow_to_eyes
//! ```
//!
//! with `PHI = 1.618`. Zero denominators are reported as
//! [`Error::DegenerateMeasurement`], never as infinity or NaN.
//!
//! ## Quick Start
//!
//! ```rust
//! use golden_face::{extract, score, LandmarkSet, Point};
//!
//! let mut points = vec![Point::zero(); 68];
//! points[23].y = 100.0; // eyebrow
//! points[27].y = 120.0; // between the eyes
//! points[33].y = 150.0; // nose
//! points[8].y = 200.0;  // chin
//!
//! let measurements = extract(&LandmarkSet::new(points)).unwrap();
//! let s = score(&measurements).unwrap();
//! assert_eq!(s.to_string(), "3.12");
//! ```
//!
//! ## Sessions
//!
//! ```rust
//! use golden_face::{
//!     BoundingBox, CaptureSession, DetectorHandle, DetectorKind, FaceObservation,
//!     ImageArtifact, Phase, RecordedDetector, SessionUpdate,
//! };
//!
//! let face = FaceObservation::BoundingBox(BoundingBox::new(40.0, 30.0, 120.0, 160.0));
//! let detector = DetectorHandle::new(RecordedDetector::new(DetectorKind::BoundingBox, vec![face]));
//!
//! let mut session = CaptureSession::new(detector);
//! session.load_model().unwrap();
//! session.capture(ImageArtifact::new(vec![0xFF, 0xD8])).unwrap();
//! let score = session.detect().unwrap();
//!
//! assert_eq!(session.phase(), Phase::Scored);
//! assert!(session
//!     .drain_updates()
//!     .any(|u| matches!(u, SessionUpdate::Scored(s) if Some(s) == score)));
//! ```

mod capture;
mod config;
mod detector;
mod error;
mod features;
mod metrics;
mod scoring;
mod session;
mod types;
mod worker;

pub use capture::{FrameSource, ImageArtifact, StillFrame};
pub use config::{SessionConfig, DEFAULT_PRECISION};
pub use detector::{
    DetectorHandle, DetectorKind, FaceObservation, LandmarkDetector, RecordedDetector, Recording,
};
pub use error::{Error, Result};
pub use features::{BoxFeatures, FeatureDistances};
pub use metrics::{extract, FacialMeasurements, BROW, CHIN, INTER_EYE, MIN_LANDMARKS, NOSE_TIP};
pub use scoring::{
    score, score_distances, strategy_for, BoxProportionStrategy, LandmarkRatioStrategy, Score,
    ScoringStrategy, PHI,
};
pub use session::{CaptureSession, Phase, SessionEvent, SessionUpdate, MAX_QUEUED_UPDATES};
pub use types::{BoundingBox, LandmarkSet, Point};
pub use worker::{DetectionWorker, JobId, JobResult};
