//! Vertical facial measurements taken from 68-point landmarks.
//!
//! Only four points are read: the inner end of the left eyebrow, the top of
//! the nose bridge (between the eyes), the bottom center of the nose, and the
//! chin. Distances are plain differences of their `y` coordinates, so a
//! mirrored or upside-down landmark layout yields negative values. Those are
//! passed through unchanged.

use crate::error::{Error, Result};
use crate::types::LandmarkSet;

/// Minimum number of points a landmark set must carry.
pub const MIN_LANDMARKS: usize = 68;

/// Inner end of the left eyebrow.
pub const BROW: usize = 23;

/// Top of the nose bridge, between the eyes.
pub const INTER_EYE: usize = 27;

/// Bottom center of the nose.
pub const NOSE_TIP: usize = 33;

/// Chin center on the jaw line.
pub const CHIN: usize = 8;

/// Vertical distances between the brow, eye line, nose and chin.
///
/// All values are in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacialMeasurements {
    /// Eyebrow (23) down to the nose bridge top (27).
    pub brow_to_eyes: f32,

    /// Nose bridge top (27) down to the nose bottom (33).
    pub eyes_to_nose: f32,

    /// Nose bottom (33) down to the chin (8).
    pub nose_to_chin: f32,
}

impl FacialMeasurements {
    /// Measure a landmark set laid out in the 68-point scheme.
    ///
    /// Fails with [`Error::InsufficientLandmarks`] if the set has fewer than
    /// [`MIN_LANDMARKS`] points. Larger sets (81-point models) are accepted.
    pub fn from_landmarks(landmarks: &LandmarkSet) -> Result<Self> {
        let found = landmarks.num_landmarks();
        if found < MIN_LANDMARKS {
            return Err(Error::InsufficientLandmarks {
                required: MIN_LANDMARKS,
                found,
            });
        }

        let brow = landmarks[BROW].y;
        let eyes = landmarks[INTER_EYE].y;
        let nose = landmarks[NOSE_TIP].y;
        let chin = landmarks[CHIN].y;

        Ok(Self {
            brow_to_eyes: eyes - brow,
            eyes_to_nose: nose - eyes,
            nose_to_chin: chin - nose,
        })
    }
}

/// Extract the measurements used for golden-ratio scoring.
pub fn extract(landmarks: &LandmarkSet) -> Result<FacialMeasurements> {
    FacialMeasurements::from_landmarks(landmarks)
}
