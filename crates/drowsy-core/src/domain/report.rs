//! Per-frame reports and run summaries.

use serde::{Deserialize, Serialize};

use super::{AlarmTransition, BoundingBox, EyeReading, Phase};

/// Frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameDimensions {
    /// Creates frame dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Measurements for one successfully analysed face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceReport {
    /// Face bounding box.
    pub bbox: BoundingBox,
    /// Detector confidence.
    pub confidence: f32,
    /// Eye aspect ratios and classification.
    #[serde(flatten)]
    pub reading: EyeReading,
}

/// Everything that happened in one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    /// Frame index.
    pub frame: u64,
    /// Frame source label.
    pub source: String,
    /// Time of analysis (RFC 3339).
    pub timestamp: String,
    /// Frame dimensions.
    pub dimensions: FrameDimensions,
    /// Faces analysed in this frame.
    pub faces: Vec<FaceReport>,
    /// Faces skipped after a processing error.
    pub failed_faces: usize,
    /// Consecutive drowsy count after this frame.
    pub counter: u32,
    /// Tracker phase after this frame.
    pub phase: Phase,
    /// Alarm changes triggered in this frame.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alarms: Vec<AlarmTransition>,
}

impl FrameReport {
    /// Returns true if the alarm started in this frame.
    #[must_use]
    pub fn alarm_started(&self) -> bool {
        self.alarms.contains(&AlarmTransition::Started)
    }

    /// Returns true if the alarm stopped in this frame.
    #[must_use]
    pub fn alarm_stopped(&self) -> bool {
        self.alarms.contains(&AlarmTransition::Stopped)
    }
}

/// Why the monitoring loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The frame source ran dry.
    EndOfStream,
    /// The user pressed the quit key.
    QuitRequested,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Frames processed.
    pub frames: u64,
    /// Faces analysed successfully.
    pub faces: u64,
    /// Faces skipped after an error.
    pub failed_faces: u64,
    /// Number of times the alarm started.
    pub alarm_onsets: u64,
    /// Why the loop ended.
    pub stop_reason: StopReason,
}
