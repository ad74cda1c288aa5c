//! Test support utilities for drowsy.
//!
//! Provides mocks for every core port plus builders for landmark sets with a
//! chosen eye aspect ratio and synthetic frames.
//!
//! # Example
//!
//! ```
//! use drowsy_test_support::{LandmarkBuilder, MockFrameSource, SyntheticFrameBuilder};
//!
//! // Landmarks whose eyes measure EAR 0.10 (closed)
//! let closed = LandmarkBuilder::new().with_ear(0.10).build();
//! assert_eq!(closed.points().len(), 68);
//!
//! // Thirty blank 64x48 frames
//! let source = MockFrameSource::new(SyntheticFrameBuilder::sequence(30, 64, 48));
//! ```

mod builders;
mod mocks;

pub use builders::{LandmarkBuilder, SyntheticFrameBuilder};
pub use mocks::face;
pub use mocks::{
    AlarmCall, DetectorStep, LandmarkStep, MockDisplay, MockFrameSource, MockProgressSink,
    MockResultOutput, RecordingAlarm, ScriptedDetector, ScriptedLandmarks,
};
