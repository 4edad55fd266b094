use proptest::prelude::*;

use golden_face::{
    extract, score, score_distances, BoundingBox, Error, FeatureDistances, LandmarkSet, Point,
    BROW, CHIN, INTER_EYE, MIN_LANDMARKS, NOSE_TIP,
};

fn landmarks(brow: f32, eyes: f32, nose: f32, chin: f32) -> LandmarkSet {
    let mut points = vec![Point::zero(); MIN_LANDMARKS];
    points[BROW].y = brow;
    points[INTER_EYE].y = eyes;
    points[NOSE_TIP].y = nose;
    points[CHIN].y = chin;
    LandmarkSet::new(points)
}

proptest! {
    #[test]
    fn pt_valid_landmarks_score_finite(
        brow in 0.0_f32..500.0,
        brow_to_eyes in 1.0_f32..200.0,
        eyes_to_nose in 0.0_f32..200.0,
        nose_to_chin in 1.0_f32..200.0,
    ) {
        let eyes = brow + brow_to_eyes;
        let nose = eyes + eyes_to_nose;
        let chin = nose + nose_to_chin;
        let set = landmarks(brow, eyes, nose, chin);

        let m = extract(&set).unwrap();
        prop_assume!(m.brow_to_eyes != 0.0 && m.nose_to_chin != 0.0);
        let s = score(&m).unwrap();
        prop_assert!(s.value().is_finite());
    }

    #[test]
    fn pt_scoring_is_idempotent(
        ys in prop::collection::vec(-1000.0_f32..1000.0, MIN_LANDMARKS..=81),
    ) {
        let set = LandmarkSet::new(ys.iter().map(|&y| Point::new(0.0, y)).collect());
        let first = extract(&set).and_then(|m| score(&m));
        let second = extract(&set).and_then(|m| score(&m));

        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(Error::DegenerateMeasurement(a)), Err(Error::DegenerateMeasurement(b))) => {
                prop_assert_eq!(a, b)
            }
            (a, b) => prop_assert!(false, "diverging results: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn pt_short_sets_never_extract(len in 0_usize..MIN_LANDMARKS) {
        let set = LandmarkSet::new(vec![Point::zero(); len]);
        let is_insufficient = matches!(
            extract(&set),
            Err(Error::InsufficientLandmarks { found, .. }) if found == len
        );
        prop_assert!(is_insufficient);
    }

    #[test]
    fn pt_scores_are_never_nan_or_infinite(
        brow in -1e6_f32..1e6,
        eyes in -1e6_f32..1e6,
        nose in -1e6_f32..1e6,
        chin in -1e6_f32..1e6,
    ) {
        if let Ok(s) = extract(&landmarks(brow, eyes, nose, chin)).and_then(|m| score(&m)) {
            prop_assert!(s.value().is_finite());
        }
    }

    #[test]
    fn pt_box_scores_are_finite(
        x in -500.0_f32..500.0,
        y in -500.0_f32..500.0,
        width in 1.0_f32..1000.0,
        height in 0.0_f32..1000.0,
    ) {
        let d = FeatureDistances::from_bounding_box(&BoundingBox::new(x, y, width, height));
        let s = score_distances(&d).unwrap();
        prop_assert!(s.value().is_finite());
        prop_assert!(s.value() >= 0.0);
    }
}
