//! Eye aspect ratio.
//!
//! EAR = (|p1 - p5| + |p2 - p4|) / (2 |p0 - p3|)
//!
//! Near zero for a closed eye, roughly 0.2-0.4 for an open one. Numerator and
//! denominator both scale with face size, so the ratio does not.

use super::{DrowsinessError, EyeShape};

/// Computes the eye aspect ratio of a six-point eye outline.
///
/// # Errors
///
/// Returns [`DrowsinessError::DegenerateEye`] when the eye corners coincide
/// (or the corner distance is not finite), and
/// [`DrowsinessError::NonFiniteEar`] when a lid point is NaN or infinite.
pub fn eye_aspect_ratio(eye: &EyeShape) -> Result<f32, DrowsinessError> {
    let [p0, p1, p2, p3, p4, p5] = eye.0;

    let width = p0.distance(p3);
    if !width.is_finite() || width <= f32::EPSILON {
        return Err(DrowsinessError::DegenerateEye { width });
    }

    let upper = p1.distance(p5);
    let lower = p2.distance(p4);

    let ear = (upper + lower) / (2.0 * width);
    if !ear.is_finite() {
        return Err(DrowsinessError::NonFiniteEar { ear });
    }

    Ok(ear)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::Point;

    /// Eye of the given width whose lids sit `open` pixels from the corner line.
    fn eye(width: f32, open: f32) -> EyeShape {
        EyeShape([
            Point::new(0.0, 0.0),
            Point::new(width / 3.0, -open),
            Point::new(2.0 * width / 3.0, -open),
            Point::new(width, 0.0),
            Point::new(2.0 * width / 3.0, open),
            Point::new(width / 3.0, open),
        ])
    }

    #[test]
    fn test_known_value() {
        // Vertical spans are 2 * open = 6 each, width 20: (6 + 6) / 40
        let ear = eye_aspect_ratio(&eye(20.0, 3.0)).unwrap();
        assert!((ear - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_closed_eye_is_zero() {
        let ear = eye_aspect_ratio(&eye(30.0, 0.0)).unwrap();
        assert!(ear.abs() < 1e-6);
    }

    #[test]
    fn test_coincident_corners_rejected() {
        let shape = EyeShape([Point::new(5.0, 5.0); 6]);
        let err = eye_aspect_ratio(&shape).unwrap_err();
        assert!(matches!(err, DrowsinessError::DegenerateEye { .. }));
    }

    #[test]
    fn test_non_finite_corners_rejected() {
        let mut shape = eye(20.0, 3.0);
        shape.0[3] = Point::new(f32::NAN, 0.0);
        assert!(eye_aspect_ratio(&shape).is_err());
    }

    #[test]
    fn test_nan_upper_lid_rejected() {
        let mut shape = eye(20.0, 3.0);
        shape.0[1] = Point::new(f32::NAN, -3.0);
        let err = eye_aspect_ratio(&shape).unwrap_err();
        assert!(matches!(err, DrowsinessError::NonFiniteEar { .. }));
    }

    #[test]
    fn test_nan_lower_lid_rejected() {
        let mut shape = eye(20.0, 3.0);
        shape.0[4] = Point::new(13.0, f32::NAN);
        let err = eye_aspect_ratio(&shape).unwrap_err();
        assert!(matches!(err, DrowsinessError::NonFiniteEar { .. }));
    }

    #[test]
    fn test_infinite_lid_rejected() {
        let mut shape = eye(20.0, 3.0);
        shape.0[2] = Point::new(13.0, f32::INFINITY);
        let err = eye_aspect_ratio(&shape).unwrap_err();
        assert!(matches!(err, DrowsinessError::NonFiniteEar { .. }));
    }

    #[test]
    fn test_scale_invariant() {
        let base = eye(24.0, 4.0);
        let reference = eye_aspect_ratio(&base).unwrap();

        for k in [0.1, 0.5, 2.0, 7.5, 100.0] {
            let scaled = eye_aspect_ratio(&base.scaled(k)).unwrap();
            assert!(
                (scaled - reference).abs() < 1e-4,
                "scale {k}: {scaled} vs {reference}"
            );
        }
    }

    #[test]
    fn test_closing_the_eye_strictly_decreases_ear() {
        let mut previous = f32::INFINITY;
        for step in (0..=10).rev() {
            #[allow(clippy::cast_precision_loss)]
            let open = step as f32 * 0.5;
            let ear = eye_aspect_ratio(&eye(20.0, open)).unwrap();
            assert!(ear < previous, "open={open}: {ear} !< {previous}");
            previous = ear;
        }
    }
}
