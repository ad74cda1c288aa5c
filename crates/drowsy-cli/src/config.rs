//! Configuration file support for drowsy.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/drowsy/config.toml` (lowest priority)
//! - Project-local: `.drowsy.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

/// Name of the project-local config file.
pub const PROJECT_CONFIG: &str = ".drowsy.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Drowsiness detection settings.
    pub detection: DetectionConfig,
    /// Alarm settings.
    pub alarm: AlarmConfig,
    /// Capture device settings.
    pub capture: CaptureConfig,
    /// Preview window settings.
    pub display: DisplayConfig,
    /// Model settings.
    pub models: ModelsConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
    /// Files this configuration was loaded from, lowest priority first.
    #[serde(skip)]
    pub sources: Vec<PathBuf>,
}

/// Drowsiness detection configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Eye aspect ratio below which a face counts as drowsy.
    pub ear_threshold: Option<f32>,
    /// Consecutive drowsy frames before the alarm sounds.
    pub consec_frames: Option<u32>,
    /// Minimum face detection confidence.
    pub min_face_confidence: Option<f32>,
}

/// Alarm configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// WAV file looped while the alarm is on.
    pub sound: Option<PathBuf>,
    /// Log alarms instead of playing audio.
    pub mute: Option<bool>,
}

/// Capture configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index.
    pub camera: Option<u32>,
}

/// Preview window configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the preview window.
    pub enabled: Option<bool>,
    /// Directory annotated frames are saved to.
    pub save_frames: Option<PathBuf>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
    /// Mirror to fetch models from instead of their upstream URLs.
    pub url: Option<String>,
    /// Use a GPU when one is compiled in and available.
    pub gpu: Option<bool>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Write per-frame reports to stdout.
    pub report: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/drowsy/config.toml`
    /// 2. Project-local: `.drowsy.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Out-of-range values are reported
    /// as warnings and dropped.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                    config.sources.push(xdg_path);
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
                config.sources.push(project_path);
            }
        }

        for warning in config.sanitize() {
            eprintln!("warning: {warning}");
        }

        config
    }

    /// Drops out-of-range values, returning one message per dropped value.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        drop_unless(
            &mut self.detection.ear_threshold,
            |t| (0.0..=1.0).contains(t),
            "detection.ear_threshold must be 0.0-1.0",
            &mut warnings,
        );
        drop_unless(
            &mut self.detection.consec_frames,
            |n| *n >= 1,
            "detection.consec_frames must be at least 1",
            &mut warnings,
        );
        drop_unless(
            &mut self.detection.min_face_confidence,
            |t| (0.0..=1.0).contains(t),
            "detection.min_face_confidence must be 0.0-1.0",
            &mut warnings,
        );
        drop_unless(
            &mut self.output.format,
            |f| f == "json" || f == "jsonl",
            "output.format must be 'json' or 'jsonl'",
            &mut warnings,
        );

        warnings
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // Detection
        self.detection.ear_threshold = other
            .detection
            .ear_threshold
            .or(self.detection.ear_threshold);
        self.detection.consec_frames = other
            .detection
            .consec_frames
            .or(self.detection.consec_frames);
        self.detection.min_face_confidence = other
            .detection
            .min_face_confidence
            .or(self.detection.min_face_confidence);

        // Alarm
        self.alarm.sound = other.alarm.sound.or_else(|| self.alarm.sound.take());
        self.alarm.mute = other.alarm.mute.or(self.alarm.mute);

        // Capture and display
        self.capture.camera = other.capture.camera.or(self.capture.camera);
        self.display.enabled = other.display.enabled.or(self.display.enabled);
        self.display.save_frames = other
            .display
            .save_frames
            .or_else(|| self.display.save_frames.take());

        // Models
        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());
        self.models.url = other.models.url.or_else(|| self.models.url.take());
        self.models.gpu = other.models.gpu.or(self.models.gpu);

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.report = other.output.report.or(self.output.report);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

fn drop_unless<T: std::fmt::Debug>(
    value: &mut Option<T>,
    valid: impl Fn(&T) -> bool,
    message: &str,
    warnings: &mut Vec<String>,
) {
    if let Some(v) = value.as_ref() {
        if !valid(v) {
            warnings.push(format!("{message}, got {v:?}; ignoring"));
            *value = None;
        }
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("drowsy").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.drowsy.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG))
        .find(|path| path.is_file())
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
