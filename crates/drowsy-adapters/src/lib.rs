//! Drowsy Adapters - External adapters for drowsy.
//!
//! This crate provides adapters for:
//! - Frame sources (image directories; cameras and video files with `camera`)
//! - Displays (headless, frame dumps; the OpenCV window with `camera`)
//! - Landmark prediction (the OpenCV LBF facemark with `camera`)
//! - Alarms (log-only; looping WAV playback with `audio`)
//! - Model downloading and caching

pub mod alarm;
#[cfg(feature = "audio")]
pub mod audio;
#[cfg(feature = "camera")]
pub mod camera;
pub mod display;
#[cfg(feature = "camera")]
pub mod facemark;
pub mod fs;
pub mod models;

pub use alarm::{AlertSound, LogAlarm};
#[cfg(feature = "audio")]
pub use audio::CpalAlarm;
#[cfg(feature = "camera")]
pub use camera::{CameraSource, WindowDisplay};
pub use display::{FrameDirWriter, HeadlessDisplay};
#[cfg(feature = "camera")]
pub use facemark::FacemarkPredictor;
pub use fs::FsFrameSource;
pub use models::{model_path, models_dir, set_models_dir};
