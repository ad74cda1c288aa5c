//! Domain errors.

use thiserror::Error;

/// Errors raised while turning landmarks into a drowsiness reading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrowsinessError {
    /// The landmark predictor returned the wrong number of points.
    #[error("expected {expected} landmarks, got {actual}")]
    LandmarkCount {
        /// Required number of points.
        expected: usize,
        /// Number of points supplied.
        actual: usize,
    },

    /// The eye corners coincide, so the aspect ratio is undefined.
    #[error("degenerate eye shape: corner distance is {width}")]
    DegenerateEye {
        /// Distance between the outer and inner eye corners.
        width: f32,
    },

    /// The lid or corner distances produced a ratio that is NaN or infinite.
    #[error("eye aspect ratio is not finite: {ear}")]
    NonFiniteEar {
        /// The computed ratio.
        ear: f32,
    },
}
