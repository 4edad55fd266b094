use thiserror::Error;

use crate::detector::DetectorKind;
use crate::session::Phase;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Insufficient landmarks: need at least {required}, got {found}")]
    InsufficientLandmarks { required: usize, found: usize },

    #[error("Degenerate measurement: {0} is zero or not finite")]
    DegenerateMeasurement(&'static str),

    #[error("Strategy `{strategy}` cannot score a {found} observation")]
    StrategyMismatch {
        strategy: &'static str,
        found: DetectorKind,
    },

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Event `{event}` not accepted in phase {phase}")]
    InvalidTransition { phase: Phase, event: &'static str },

    #[error("Capture source produced no frame")]
    NoFrame,

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
