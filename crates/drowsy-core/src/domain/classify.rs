//! Drowsiness classification from one face's landmarks.

use serde::{Deserialize, Serialize};

use super::{eye_aspect_ratio, DrowsinessError, Landmarks, Point};

/// Default EAR below which eyes count as closed.
pub const DEFAULT_EAR_THRESHOLD: f32 = 0.25;

/// Eye measurements for one face in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeReading {
    /// Left eye aspect ratio.
    pub left_ear: f32,
    /// Right eye aspect ratio.
    pub right_ear: f32,
    /// Mean of both eyes.
    pub ear: f32,
    /// Whether the mean fell below the threshold.
    pub drowsy: bool,
}

/// Threshold classifier over the averaged eye aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeClassifier {
    threshold: f32,
}

impl Default for EyeClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EAR_THRESHOLD)
    }
}

impl EyeClassifier {
    /// Creates a classifier with the given EAR threshold.
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Measures both eyes and classifies the face.
    ///
    /// # Errors
    ///
    /// Returns an error if either eye shape is degenerate.
    pub fn classify(&self, landmarks: &Landmarks) -> Result<EyeReading, DrowsinessError> {
        let left_ear = eye_aspect_ratio(&landmarks.left_eye())?;
        let right_ear = eye_aspect_ratio(&landmarks.right_eye())?;
        let ear = (left_ear + right_ear) / 2.0;

        Ok(EyeReading {
            left_ear,
            right_ear,
            ear,
            drowsy: ear < self.threshold,
        })
    }

    /// Classifies a raw point list, checking that all 68 landmarks are present.
    ///
    /// # Errors
    ///
    /// Returns an error on a short point list or a degenerate eye.
    pub fn classify_points(&self, points: &[Point]) -> Result<EyeReading, DrowsinessError> {
        let landmarks = Landmarks::new(points.to_vec())?;
        self.classify(&landmarks)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::{LANDMARK_COUNT, LEFT_EYE, RIGHT_EYE};

    /// Face whose eyes are 30px wide with lids `open` px off the corner line.
    fn face(open: f32) -> Vec<Point> {
        let mut points = vec![Point::new(50.0, 50.0); LANDMARK_COUNT];
        for (range, x0) in [(LEFT_EYE, 100.0), (RIGHT_EYE, 200.0)] {
            let outline = [
                Point::new(x0, 100.0),
                Point::new(x0 + 10.0, 100.0 - open),
                Point::new(x0 + 20.0, 100.0 - open),
                Point::new(x0 + 30.0, 100.0),
                Point::new(x0 + 20.0, 100.0 + open),
                Point::new(x0 + 10.0, 100.0 + open),
            ];
            points[range].copy_from_slice(&outline);
        }
        points
    }

    #[test]
    fn test_default_threshold() {
        assert!((EyeClassifier::default().threshold() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_open_eyes_are_awake() {
        // (9 + 9) / 60 = 0.3
        let reading = EyeClassifier::default().classify_points(&face(4.5)).unwrap();
        assert!((reading.ear - 0.3).abs() < 1e-5);
        assert!(!reading.drowsy);
    }

    #[test]
    fn test_closed_eyes_are_drowsy() {
        let reading = EyeClassifier::default().classify_points(&face(1.0)).unwrap();
        assert!(reading.drowsy);
    }

    #[test]
    fn test_average_of_both_eyes() {
        let mut points = face(4.5);
        // Collapse the right eye entirely.
        let corner = points[RIGHT_EYE.start];
        for p in &mut points[RIGHT_EYE.start + 1..RIGHT_EYE.start + 3] {
            p.y = corner.y;
        }
        for p in &mut points[RIGHT_EYE.start + 4..RIGHT_EYE.end] {
            p.y = corner.y;
        }

        let reading = EyeClassifier::default().classify_points(&points).unwrap();
        assert!((reading.left_ear - 0.3).abs() < 1e-5);
        assert!(reading.right_ear.abs() < 1e-5);
        assert!((reading.ear - 0.15).abs() < 1e-5);
        assert!(reading.drowsy);
    }

    #[test]
    fn test_too_few_landmarks() {
        let points = face(4.5);
        let err = EyeClassifier::default()
            .classify_points(&points[..47])
            .unwrap_err();
        assert!(matches!(err, DrowsinessError::LandmarkCount { .. }));
    }

    #[test]
    fn test_nan_lid_is_an_error_not_awake() {
        // Closed eyes with one NaN upper-lid point on the left.
        let mut points = face(1.0);
        points[LEFT_EYE.start + 1].x = f32::NAN;
        let err = EyeClassifier::default()
            .classify_points(&points)
            .unwrap_err();
        assert!(matches!(err, DrowsinessError::NonFiniteEar { .. }));
    }

    #[test]
    fn test_closing_crosses_threshold_once() {
        let classifier = EyeClassifier::default();
        let mut previous_ear = f32::INFINITY;
        let mut flips = 0;
        let mut was_drowsy = false;

        for step in (0..=20).rev() {
            #[allow(clippy::cast_precision_loss)]
            let open = step as f32 * 0.5;
            let reading = classifier.classify_points(&face(open)).unwrap();

            assert!(reading.ear < previous_ear);
            previous_ear = reading.ear;

            if reading.drowsy != was_drowsy {
                assert!(reading.drowsy, "classification must only flip towards drowsy");
                flips += 1;
                was_drowsy = reading.drowsy;
            }
        }

        assert_eq!(flips, 1);
        assert!(was_drowsy);
    }

    #[test]
    fn test_custom_threshold() {
        let strict = EyeClassifier::new(0.35);
        assert!(strict.classify_points(&face(4.5)).unwrap().drowsy);
    }
}
