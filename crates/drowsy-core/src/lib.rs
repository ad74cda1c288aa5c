//! Drowsiness Core - Domain logic, ports and the monitoring pipeline
//!
//! This crate contains the eye-aspect-ratio classifier, the drowsiness state
//! machine, the per-frame monitor, and the Candle face detector.

pub mod domain;
pub mod inference;
pub mod monitor;
pub mod ports;

pub use domain::{
    eye_aspect_ratio, AlarmTransition, DrowsinessError, DrowsinessTracker, EyeClassifier,
    EyeReading, FaceRegion, Frame, FrameReport, Landmarks, Phase, Point, RunSummary, StopReason,
};
pub use monitor::{FrameOutcome, Monitor, MonitorConfig};
pub use ports::{
    Alarm, FaceDetector, FrameDisplay, FrameSource, KeyAction, LandmarkPredictor, MonitorEvent,
    ProgressSink, ResultOutput,
};
