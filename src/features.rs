use crate::types::{BoundingBox, Point};

/// Facial feature positions approximated from a face bounding box.
///
/// Used when the upstream detector reports only a face box (fast mobile
/// face detection) instead of full landmarks. The eyes sit on the top
/// corners of the box, the nose at its center and the mouth at the middle
/// of the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxFeatures {
    pub left_eye: Point,
    pub right_eye: Point,
    pub nose: Point,
    pub mouth: Point,
}

impl BoxFeatures {
    pub fn from_bounding_box(bbox: &BoundingBox) -> Self {
        let origin = bbox.origin();
        Self {
            left_eye: origin,
            right_eye: origin + Point::new(bbox.width, 0.0),
            nose: bbox.center(),
            mouth: origin + Point::new(bbox.width / 2.0, bbox.height),
        }
    }

    pub fn distances(&self) -> FeatureDistances {
        FeatureDistances {
            eye_distance: self.left_eye.distance(&self.right_eye),
            mouth_nose_distance: self.mouth.distance(&self.nose),
        }
    }
}

/// Euclidean distances between the synthetic features, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDistances {
    pub eye_distance: f32,
    pub mouth_nose_distance: f32,
}

impl FeatureDistances {
    pub fn from_bounding_box(bbox: &BoundingBox) -> Self {
        BoxFeatures::from_bounding_box(bbox).distances()
    }
}
