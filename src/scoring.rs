//! Golden-ratio scoring.
//!
//! Two formulas exist, one per kind of detector output:
//!
//! - [`LandmarkRatioStrategy`] works on 68-point landmarks and compares the
//!   upper face (brow to nose) with the lower face (nose to chin).
//! - [`BoxProportionStrategy`] works on a bare face bounding box and compares
//!   the mouth-to-nose distance against the eye distance.
//!
//! Scores are unbounded. Divisions are checked: a zero or non-finite
//! denominator fails with [`Error::DegenerateMeasurement`] instead of
//! producing infinity or NaN.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detector::{DetectorKind, FaceObservation};
use crate::error::{Error, Result};
use crate::features::FeatureDistances;
use crate::metrics::{extract, FacialMeasurements};

/// Golden ratio reference value.
pub const PHI: f32 = 1.618;

/// Weight of the eye distance term in the bounding-box formula.
const EYE_DISTANCE_WEIGHT: f32 = 20.0;

/// Weight of the proportion term in the bounding-box formula.
const PROPORTION_WEIGHT: f32 = 10.0;

/// Normalization of the bounding-box formula onto a percentage.
const BOX_NORMALIZATION: f32 = 30.0;

/// A finite golden-ratio score.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(f32);

impl Score {
    fn checked(value: f32) -> Result<Self> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(Error::DegenerateMeasurement("score"))
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Format with a fixed number of decimals.
    pub fn format(&self, precision: usize) -> String {
        format!("{:.*}", precision, self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Divide, failing on a zero or non-finite denominator.
fn checked_ratio(numerator: f32, denominator: f32, name: &'static str) -> Result<f32> {
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(Error::DegenerateMeasurement(name));
    }
    Ok(numerator / denominator)
}

/// Score landmark measurements.
///
/// `((brow_to_eyes + eyes_to_nose) / nose_to_chin) * PHI + eyes_to_nose / brow_to_eyes`
pub fn score(m: &FacialMeasurements) -> Result<Score> {
    let upper_to_lower = checked_ratio(
        m.brow_to_eyes + m.eyes_to_nose,
        m.nose_to_chin,
        "nose_to_chin",
    )?;
    let nose_to_brow = checked_ratio(m.eyes_to_nose, m.brow_to_eyes, "brow_to_eyes")?;
    Score::checked(upper_to_lower * PHI + nose_to_brow)
}

/// Score feature distances derived from a face bounding box.
///
/// `((|eye_distance| * 20 + |mouth_nose_distance / eye_distance - PHI| * 10) / 30) * 100`
pub fn score_distances(d: &FeatureDistances) -> Result<Score> {
    let proportion = checked_ratio(d.mouth_nose_distance, d.eye_distance, "eye_distance")?;
    let raw = d.eye_distance.abs() * EYE_DISTANCE_WEIGHT
        + (proportion - PHI).abs() * PROPORTION_WEIGHT;
    Score::checked(raw / BOX_NORMALIZATION * 100.0)
}

/// A way of turning one detected face into a score.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The detector output this strategy understands.
    fn accepts(&self) -> DetectorKind;

    fn score(&self, face: &FaceObservation) -> Result<Score>;
}

/// Scores 68-point landmarks through [`FacialMeasurements`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkRatioStrategy;

impl ScoringStrategy for LandmarkRatioStrategy {
    fn name(&self) -> &'static str {
        "landmark_ratio"
    }

    fn accepts(&self) -> DetectorKind {
        DetectorKind::Landmarks68
    }

    fn score(&self, face: &FaceObservation) -> Result<Score> {
        match face {
            FaceObservation::Landmarks(landmarks) => score(&extract(landmarks)?),
            other => Err(Error::StrategyMismatch {
                strategy: self.name(),
                found: other.kind(),
            }),
        }
    }
}

/// Scores a face bounding box through [`FeatureDistances`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxProportionStrategy;

impl ScoringStrategy for BoxProportionStrategy {
    fn name(&self) -> &'static str {
        "box_proportion"
    }

    fn accepts(&self) -> DetectorKind {
        DetectorKind::BoundingBox
    }

    fn score(&self, face: &FaceObservation) -> Result<Score> {
        match face {
            FaceObservation::BoundingBox(bbox) => {
                score_distances(&FeatureDistances::from_bounding_box(bbox))
            }
            other => Err(Error::StrategyMismatch {
                strategy: self.name(),
                found: other.kind(),
            }),
        }
    }
}

/// Pick the strategy matching a detector's output.
pub fn strategy_for(kind: DetectorKind) -> Box<dyn ScoringStrategy> {
    match kind {
        DetectorKind::Landmarks68 => Box::new(LandmarkRatioStrategy),
        DetectorKind::BoundingBox => Box::new(BoxProportionStrategy),
    }
}
