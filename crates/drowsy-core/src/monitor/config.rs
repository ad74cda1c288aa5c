//! Monitoring configuration.

use std::path::{Path, PathBuf};

use crate::domain::{DEFAULT_CONSEC_FRAMES, DEFAULT_EAR_THRESHOLD};

/// Default alert sound file.
pub const DEFAULT_ALERT_SOUND: &str = "alert.wav";

/// Configuration for the monitoring loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Eye aspect ratio threshold.
    /// Faces with a mean EAR below this are classified drowsy.
    pub ear_threshold: f32,

    /// Consecutive drowsy frames before the alarm sounds.
    pub consec_frames: u32,

    /// Minimum face detection confidence.
    pub min_face_confidence: f32,

    /// Sound looped while the alarm is on.
    pub alert_sound: PathBuf,

    /// Draw eye landmark markers on displayed frames.
    pub annotate: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            consec_frames: DEFAULT_CONSEC_FRAMES,
            min_face_confidence: 0.5,
            alert_sound: PathBuf::from(DEFAULT_ALERT_SOUND),
            annotate: true,
        }
    }
}

impl MonitorConfig {
    /// Sets the EAR threshold.
    #[must_use]
    pub fn with_ear_threshold(mut self, threshold: f32) -> Self {
        self.ear_threshold = threshold;
        self
    }

    /// Sets the consecutive frame count.
    #[must_use]
    pub fn with_consec_frames(mut self, frames: u32) -> Self {
        self.consec_frames = frames;
        self
    }

    /// Sets the alert sound path.
    #[must_use]
    pub fn with_alert_sound(mut self, path: impl AsRef<Path>) -> Self {
        self.alert_sound = path.as_ref().to_path_buf();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert!((config.ear_threshold - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.consec_frames, 20);
        assert_eq!(config.alert_sound, PathBuf::from("alert.wav"));
        assert!(config.annotate);
    }

    #[test]
    fn test_config_builder() {
        let config = MonitorConfig::default()
            .with_ear_threshold(0.2)
            .with_consec_frames(5)
            .with_alert_sound("/tmp/beep.wav");

        assert!((config.ear_threshold - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.consec_frames, 5);
        assert_eq!(config.alert_sound, PathBuf::from("/tmp/beep.wav"));
    }
}
