//! Capture-to-score session state machine.
//!
//! ```text
//! Idle -> ModelLoading -> Ready -> Captured -> Detecting -> Scored
//!                           ^         |            |          |
//!                           +---------+ (recapture) |          |
//!                           +----------------------+ (no face)|
//!                           +---------------------------------+ (retake)
//! ```
//!
//! Every input is applied synchronously and in call order. An input that
//! the current phase does not accept is rejected with
//! [`Error::InvalidTransition`] and leaves the session untouched. Outcomes
//! are queued as [`SessionUpdate`]s and read with
//! [`CaptureSession::drain_updates`]. The owner is expected to drain the
//! queue after each input; at most [`MAX_QUEUED_UPDATES`] are kept and the
//! oldest are dropped past that.

use std::collections::{vec_deque, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::capture::{FrameSource, ImageArtifact};
use crate::config::SessionConfig;
use crate::detector::{DetectorHandle, FaceObservation};
use crate::error::{Error, Result};
use crate::scoring::{strategy_for, Score, ScoringStrategy};

/// Updates kept for an owner that has not drained the queue.
pub const MAX_QUEUED_UPDATES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    ModelLoading,
    Ready,
    Captured,
    Detecting,
    Scored,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::ModelLoading => "model_loading",
            Phase::Ready => "ready",
            Phase::Captured => "captured",
            Phase::Detecting => "detecting",
            Phase::Scored => "scored",
        };
        f.write_str(name)
    }
}

/// An input to the session.
#[derive(Debug)]
pub enum SessionEvent {
    LoadRequested,
    ModelLoaded,
    ModelLoadFailed(String),
    Captured(ImageArtifact),
    DetectRequested,
    DetectionFinished(Result<Option<FaceObservation>>),
    DetectionCancelled,
    Retake,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::LoadRequested => "load_requested",
            SessionEvent::ModelLoaded => "model_loaded",
            SessionEvent::ModelLoadFailed(_) => "model_load_failed",
            SessionEvent::Captured(_) => "capture",
            SessionEvent::DetectRequested => "detect",
            SessionEvent::DetectionFinished(_) => "detection_finished",
            SessionEvent::DetectionCancelled => "cancel_detection",
            SessionEvent::Retake => "retake",
        }
    }
}

/// An outcome reported to the session's owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionUpdate {
    PhaseChanged { from: Phase, to: Phase },
    Scored(Score),
    NoFaceDetected,
    ModelLoadFailed(String),
    /// A new load attempt started after a failed one.
    LoadRetried,
    DetectionCancelled,
}

/// One capture-to-score interaction.
pub struct CaptureSession {
    detector: DetectorHandle,
    strategy: Box<dyn ScoringStrategy>,
    phase: Phase,
    pending_image: Option<ImageArtifact>,
    last_score: Option<Score>,
    load_error: Option<String>,
    updates: VecDeque<SessionUpdate>,
}

impl CaptureSession {
    /// Create an idle session scoring with the strategy that matches the
    /// detector's output.
    pub fn new(detector: DetectorHandle) -> Self {
        let strategy = strategy_for(detector.kind());
        Self::with_strategy(detector, strategy)
    }

    pub fn with_strategy(detector: DetectorHandle, strategy: Box<dyn ScoringStrategy>) -> Self {
        Self {
            detector,
            strategy,
            phase: Phase::Idle,
            pending_image: None,
            last_score: None,
            load_error: None,
            updates: VecDeque::new(),
        }
    }

    /// Fails with [`Error::StrategyMismatch`] if the configured strategy
    /// cannot score the detector's output.
    pub fn from_config(detector: DetectorHandle, config: &SessionConfig) -> Result<Self> {
        let strategy = config.strategy_for(detector.kind())?;
        Ok(Self::with_strategy(detector, strategy))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_image(&self) -> Option<&ImageArtifact> {
        self.pending_image.as_ref()
    }

    pub fn last_score(&self) -> Option<Score> {
        self.last_score
    }

    /// Reason the last model load failed, while the session is stuck in
    /// [`Phase::ModelLoading`].
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn detector(&self) -> &DetectorHandle {
        &self.detector
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Number of updates waiting to be drained.
    pub fn queued_updates(&self) -> usize {
        self.updates.len()
    }

    /// Take all queued updates, oldest first.
    pub fn drain_updates(&mut self) -> vec_deque::Drain<'_, SessionUpdate> {
        self.updates.drain(..)
    }

    /// Apply one input event.
    pub fn apply(&mut self, event: SessionEvent) -> Result<()> {
        log::trace!("applying {} in phase {}", event.name(), self.phase);
        match event {
            SessionEvent::LoadRequested => self.begin_loading(),
            SessionEvent::ModelLoaded => self.model_loaded(),
            SessionEvent::ModelLoadFailed(reason) => self.model_load_failed(reason),
            SessionEvent::Captured(image) => self.capture(image),
            SessionEvent::DetectRequested => self.begin_detection().map(|_| ()),
            SessionEvent::DetectionFinished(result) => self.complete_detection(result).map(|_| ()),
            SessionEvent::DetectionCancelled => self.cancel_detection(),
            SessionEvent::Retake => self.retake(),
        }
    }

    /// `Idle -> ModelLoading`. Also retries a failed load.
    pub fn begin_loading(&mut self) -> Result<()> {
        match self.phase {
            Phase::Idle => {
                self.transition(Phase::ModelLoading);
                Ok(())
            }
            Phase::ModelLoading if self.load_error.is_some() => {
                log::info!("retrying model load after: {:?}", self.load_error);
                self.load_error = None;
                self.push_update(SessionUpdate::LoadRetried);
                Ok(())
            }
            phase => Err(self.reject(phase, "load_requested")),
        }
    }

    /// `ModelLoading -> Ready`.
    pub fn model_loaded(&mut self) -> Result<()> {
        self.require(Phase::ModelLoading, "model_loaded")?;
        self.load_error = None;
        self.transition(Phase::Ready);
        Ok(())
    }

    /// Record a load failure. The session stays in `ModelLoading` and
    /// refuses captures until a load succeeds.
    pub fn model_load_failed(&mut self, reason: String) -> Result<()> {
        self.require(Phase::ModelLoading, "model_load_failed")?;
        log::error!("model load failed: {}", reason);
        self.load_error = Some(reason.clone());
        self.push_update(SessionUpdate::ModelLoadFailed(reason));
        Ok(())
    }

    /// Load the detector in place and move to `Ready`.
    pub fn load_model(&mut self) -> Result<()> {
        self.begin_loading()?;
        match self.detector.load() {
            Ok(()) => self.model_loaded(),
            Err(err) => {
                self.model_load_failed(err.to_string())?;
                Err(err)
            }
        }
    }

    /// Store a captured frame, replacing any frame not yet detected.
    pub fn capture(&mut self, image: ImageArtifact) -> Result<()> {
        match self.phase {
            Phase::Ready => {}
            Phase::Captured => {
                log::debug!("new capture replaces pending image");
                self.pending_image = None;
                self.transition(Phase::Ready);
            }
            phase => return Err(self.reject(phase, "capture")),
        }
        self.pending_image = Some(image);
        self.transition(Phase::Captured);
        Ok(())
    }

    /// Pull a frame from `source` and capture it.
    pub fn capture_from<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        if !matches!(self.phase, Phase::Ready | Phase::Captured) {
            return Err(self.reject(self.phase, "capture"));
        }
        match source.capture_frame() {
            Some(image) => self.capture(image),
            None => {
                log::error!("failed to capture image");
                Err(Error::NoFrame)
            }
        }
    }

    /// `Captured -> Detecting`. Returns the frame to hand to the detector.
    pub fn begin_detection(&mut self) -> Result<ImageArtifact> {
        self.require(Phase::Captured, "detect")?;
        let image = match &self.pending_image {
            Some(image) => image.clone(),
            None => return Err(self.reject(self.phase, "detect")),
        };
        self.transition(Phase::Detecting);
        Ok(image)
    }

    /// `Detecting -> Scored` when the detector found a scorable face,
    /// `Detecting -> Ready` otherwise.
    ///
    /// Measurement and detector failures count as "no face detected" and
    /// never reach the caller as a score.
    pub fn complete_detection(
        &mut self,
        result: Result<Option<FaceObservation>>,
    ) -> Result<Option<Score>> {
        self.require(Phase::Detecting, "detection_finished")?;

        let score = match result {
            Ok(Some(face)) => match self.strategy.score(&face) {
                Ok(score) => Some(score),
                Err(err @ Error::DegenerateMeasurement(_)) => {
                    log::warn!("face could not be scored: {}", err);
                    None
                }
                Err(err) => {
                    log::error!("detector returned an unusable face: {}", err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                log::error!("detection failed: {}", err);
                None
            }
        };

        match score {
            Some(score) => {
                log::info!("scored {} with {}", score, self.strategy.name());
                self.last_score = Some(score);
                self.transition(Phase::Scored);
                self.push_update(SessionUpdate::Scored(score));
            }
            None => {
                self.pending_image = None;
                self.transition(Phase::Ready);
                self.push_update(SessionUpdate::NoFaceDetected);
            }
        }
        Ok(score)
    }

    /// Run the detector inline on the pending frame.
    pub fn detect(&mut self) -> Result<Option<Score>> {
        let image = self.begin_detection()?;
        let result = self.detector.detect_first_face(&image);
        self.complete_detection(result)
    }

    /// `Detecting -> Ready`, dropping the pending frame.
    pub fn cancel_detection(&mut self) -> Result<()> {
        self.require(Phase::Detecting, "cancel_detection")?;
        self.pending_image = None;
        self.transition(Phase::Ready);
        self.push_update(SessionUpdate::DetectionCancelled);
        Ok(())
    }

    /// `Scored -> Ready`. The last score is kept until a new one replaces it.
    pub fn retake(&mut self) -> Result<()> {
        self.require(Phase::Scored, "retake")?;
        self.pending_image = None;
        self.transition(Phase::Ready);
        Ok(())
    }

    fn require(&self, phase: Phase, event: &'static str) -> Result<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.reject(self.phase, event))
        }
    }

    fn reject(&self, phase: Phase, event: &'static str) -> Error {
        log::debug!("rejected {} in phase {}", event, phase);
        Error::InvalidTransition { phase, event }
    }

    fn push_update(&mut self, update: SessionUpdate) {
        if self.updates.len() == MAX_QUEUED_UPDATES {
            if let Some(dropped) = self.updates.pop_front() {
                log::warn!("update queue full, dropping {:?}", dropped);
            }
        }
        self.updates.push_back(update);
    }

    fn transition(&mut self, to: Phase) {
        let from = self.phase;
        log::debug!("session {} -> {}", from, to);
        self.phase = to;
        self.push_update(SessionUpdate::PhaseChanged { from, to });
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("phase", &self.phase)
            .field("strategy", &self.strategy.name())
            .field("has_pending_image", &self.pending_image.is_some())
            .field("last_score", &self.last_score)
            .field("load_error", &self.load_error)
            .finish()
    }
}
