//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod alarm;
mod detector;
mod display;
mod frame_source;
mod progress;
mod result_output;

pub use alarm::Alarm;
pub use detector::{FaceDetector, LandmarkPredictor};
pub use display::{FrameDisplay, KeyAction};
pub use frame_source::FrameSource;
pub use progress::{MonitorEvent, ProgressSink};
pub use result_output::ResultOutput;
