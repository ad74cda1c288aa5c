//! Core domain types for drowsiness detection.

mod classify;
mod ear;
mod error;
mod frame;
mod geometry;
mod report;
mod state;

pub use classify::{EyeClassifier, EyeReading, DEFAULT_EAR_THRESHOLD};
pub use ear::eye_aspect_ratio;
pub use error::DrowsinessError;
pub use frame::Frame;
pub use geometry::{
    BoundingBox, EyeShape, FaceRegion, Landmarks, Point, EYE_MARKERS, LANDMARK_COUNT, LEFT_EYE,
    RIGHT_EYE,
};
pub use report::{FaceReport, FrameDimensions, FrameReport, RunSummary, StopReason};
pub use state::{AlarmTransition, DrowsinessTracker, Phase, DEFAULT_CONSEC_FRAMES};
