//! Run command - monitor a frame stream for drowsiness.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};
use drowsy_adapters::models::{require_model, FACE_DETECTOR, LANDMARK_PREDICTOR};
use drowsy_adapters::{
    models_dir, set_models_dir, FrameDirWriter, FsFrameSource, HeadlessDisplay, LogAlarm,
};
use drowsy_core::inference::{load_model, select_device, BlazeFace};
use drowsy_core::{
    Alarm, FrameDisplay, FrameSource, LandmarkPredictor, Monitor, MonitorConfig, ProgressSink,
    ResultOutput, RunSummary,
};
use serde::Serialize;
use tracing::{debug, info};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressReporter};

/// Output format for frame reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per frame)
    #[default]
    Jsonl,
    /// Single JSON array written when monitoring ends
    Json,
}

/// Hardcoded default values.
mod defaults {
    pub const EAR_THRESHOLD: f32 = drowsy_core::domain::DEFAULT_EAR_THRESHOLD;
    pub const CONSEC_FRAMES: u32 = drowsy_core::domain::DEFAULT_CONSEC_FRAMES;
    pub const MIN_FACE_CONFIDENCE: f32 = 0.5;
    pub const ALERT_SOUND: &str = drowsy_core::monitor::DEFAULT_ALERT_SOUND;
    pub const CAMERA: u32 = 0;
}

/// Parse and validate a threshold value (0.0-1.0).
fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse a frame count of at least one.
fn parse_frame_count(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid frame count"))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err("frame count must be at least 1".to_string())
    }
}

/// Arguments for monitoring.
#[derive(Args, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Camera device index
    #[arg(long, value_name = "INDEX", conflicts_with_all = ["video", "frames"])]
    pub camera: Option<u32>,

    /// Video file to replay instead of a camera
    #[arg(long, value_name = "FILE", conflicts_with = "frames")]
    pub video: Option<PathBuf>,

    /// Directory of still frames to replay in name order
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,

    /// Eye aspect ratio below which eyes count as closed (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub ear_threshold: Option<f32>,

    /// Consecutive drowsy frames before the alarm sounds
    #[arg(long, value_parser = parse_frame_count)]
    pub consec_frames: Option<u32>,

    /// Minimum face detection confidence (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub min_face_confidence: Option<f32>,

    /// WAV file looped while the alarm is on
    #[arg(long, value_name = "FILE")]
    pub alarm: Option<PathBuf>,

    /// Log alarms instead of playing sound
    #[arg(long)]
    pub mute: bool,

    /// Do not open a preview window
    #[arg(long)]
    pub no_display: bool,

    /// Save every annotated frame as a PNG into DIR
    #[arg(long, value_name = "DIR")]
    pub save_frames: Option<PathBuf>,

    /// Output format for frame reports
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Do not write frame reports to stdout
    #[arg(long)]
    pub no_report: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Run inference on the CPU even when a GPU is available
    #[arg(long)]
    pub cpu: bool,

    /// Camera index from config, used when no source flag is given.
    #[arg(skip)]
    config_camera: Option<u32>,

    /// Model mirror URL from config.
    #[arg(skip)]
    models_url: Option<String>,
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum SourceSpec {
    /// Live camera by device index.
    Camera(u32),
    /// Video file replay.
    Video(PathBuf),
    /// Still frame directory replay.
    Frames(PathBuf),
}

/// Effective settings after defaults, config files and flags are layered.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Frame source.
    pub source: SourceSpec,
    /// Detection settings.
    pub detection: DetectionSettings,
    /// Alarm settings.
    pub alarm: AlarmSettings,
    /// Display settings.
    pub display: DisplaySettings,
    /// Model settings.
    pub models: ModelSettings,
    /// Output settings.
    pub output: OutputSettings,
}

/// Effective detection settings.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionSettings {
    pub ear_threshold: f32,
    pub consec_frames: u32,
    pub min_face_confidence: f32,
}

/// Effective alarm settings.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmSettings {
    pub sound: PathBuf,
    pub mute: bool,
}

/// Effective display settings.
#[derive(Debug, Clone, Serialize)]
pub struct DisplaySettings {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_frames: Option<PathBuf>,
}

/// Effective model settings.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSettings {
    pub dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub gpu: bool,
}

/// Effective output settings.
#[derive(Debug, Clone, Serialize)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub pretty: bool,
    pub report: bool,
    pub progress: bool,
}

/// Result of a monitoring run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Run totals.
    pub summary: RunSummary,
    /// Process exit code.
    pub exit_code: ExitCode,
}

impl RunArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    ///
    /// For boolean flags: CLI `--no-*` and `--mute` always win. Config can
    /// enable/disable only when the CLI flag wasn't explicitly set.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        // Thresholds: CLI > config (accessor provides hardcoded fallback)
        args.ear_threshold = args.ear_threshold.or(config.detection.ear_threshold);
        args.consec_frames = args.consec_frames.or(config.detection.consec_frames);
        args.min_face_confidence = args
            .min_face_confidence
            .or(config.detection.min_face_confidence);

        // Alarm
        if args.alarm.is_none() {
            args.alarm.clone_from(&config.alarm.sound);
        }
        if !args.mute {
            args.mute = config.alarm.mute.unwrap_or(false);
        }

        // Capture: config camera only applies when no source flag was given
        args.config_camera = config.capture.camera;

        // Display
        if !args.no_display {
            if let Some(enabled) = config.display.enabled {
                args.no_display = !enabled;
            }
        }
        if args.save_frames.is_none() {
            args.save_frames.clone_from(&config.display.save_frames);
        }

        // Output format: CLI > config (accessor provides fallback)
        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.no_report {
            if let Some(report) = config.output.report {
                args.no_report = !report;
            }
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        // Models
        if args.models_dir.is_none() {
            args.models_dir.clone_from(&config.models.dir);
        }
        args.models_url.clone_from(&config.models.url);
        if !args.cpu {
            if let Some(gpu) = config.models.gpu {
                args.cpu = !gpu;
            }
        }

        args
    }

    /// Get EAR threshold with fallback to hardcoded default.
    fn ear_threshold(&self) -> f32 {
        self.ear_threshold.unwrap_or(defaults::EAR_THRESHOLD)
    }

    /// Get consecutive frame count with fallback to hardcoded default.
    fn consec_frames(&self) -> u32 {
        self.consec_frames.unwrap_or(defaults::CONSEC_FRAMES)
    }

    /// Get minimum face confidence with fallback to hardcoded default.
    fn min_face_confidence(&self) -> f32 {
        self.min_face_confidence
            .unwrap_or(defaults::MIN_FACE_CONFIDENCE)
    }

    /// Get alert sound with fallback to hardcoded default.
    fn alert_sound(&self) -> PathBuf {
        self.alarm
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::ALERT_SOUND))
    }

    /// Get output format with fallback to hardcoded default.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Models directory: CLI/config override, else the default location.
    pub fn resolved_models_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(models_dir)
    }

    /// Model mirror URL from config, if any.
    pub fn models_url(&self) -> Option<&str> {
        self.models_url.as_deref()
    }

    /// The frame source to open. Flags win over the configured camera.
    pub fn source(&self) -> SourceSpec {
        if let Some(dir) = &self.frames {
            SourceSpec::Frames(dir.clone())
        } else if let Some(path) = &self.video {
            SourceSpec::Video(path.clone())
        } else {
            SourceSpec::Camera(
                self.camera
                    .or(self.config_camera)
                    .unwrap_or(defaults::CAMERA),
            )
        }
    }

    /// Resolves every setting to its effective value.
    pub fn settings(&self) -> Settings {
        Settings {
            source: self.source(),
            detection: DetectionSettings {
                ear_threshold: self.ear_threshold(),
                consec_frames: self.consec_frames(),
                min_face_confidence: self.min_face_confidence(),
            },
            alarm: AlarmSettings {
                sound: self.alert_sound(),
                mute: self.mute,
            },
            display: DisplaySettings {
                enabled: !self.no_display,
                save_frames: self.save_frames.clone(),
            },
            models: ModelSettings {
                dir: self.resolved_models_dir(),
                url: self.models_url.clone(),
                gpu: !self.cpu,
            },
            output: OutputSettings {
                format: self.format(),
                pretty: self.pretty,
                report: !self.no_report,
                progress: self.progress,
            },
        }
    }

    fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            min_face_confidence: self.min_face_confidence(),
            ..MonitorConfig::default()
        }
        .with_ear_threshold(self.ear_threshold())
        .with_consec_frames(self.consec_frames())
        .with_alert_sound(self.alert_sound())
    }
}

/// Run monitoring until the stream ends or the user quits.
///
/// # Errors
///
/// Returns an error if models are missing or invalid, the frame source
/// cannot be opened or fails mid-stream, or reports cannot be written.
pub fn run(args: &RunArgs) -> Result<RunOutcome> {
    let settings = args.settings();
    debug!("Effective settings: {settings:?}");

    // Models are resolved before any device is touched
    let dir = settings.models.dir.clone();
    if args.models_dir.is_some() && !set_models_dir(&dir) {
        debug!("Models directory already set");
    }
    let detector_path = require_model(&dir, FACE_DETECTOR)?;
    let landmarks_path = require_model(&dir, LANDMARK_PREDICTOR)?;

    let device = select_device(settings.models.gpu);
    let detector = load_model(&detector_path, &device, BlazeFace::new)?;
    let predictor = build_predictor(&landmarks_path)?;

    let mut source = open_source(&settings.source)?;
    let alarm = build_alarm(&settings.alarm);
    let display = build_display(&settings.display)?;
    let mut display: Box<dyn FrameDisplay> = match &settings.display.save_frames {
        Some(dir) => Box::new(FrameDirWriter::new(dir, display)?),
        None => display,
    };

    let show_bar = settings.output.progress && std::io::stderr().is_terminal();
    let reporter = Arc::new(ProgressReporter::new(
        source.len_hint(),
        args.quiet,
        show_bar,
    ));

    let mut monitor = Monitor::new(
        args.monitor_config(),
        Box::new(detector),
        predictor,
        alarm,
    )
    .with_progress(Arc::clone(&reporter) as Arc<dyn ProgressSink>);

    if settings.output.report {
        let output = JsonOutput::stdout(settings.output.format, settings.output.pretty);
        monitor = monitor.with_output(Arc::new(output) as Arc<dyn ResultOutput>);
    }

    let summary = monitor.run(source.as_mut(), display.as_mut())?;

    let exit_code = if summary.alarm_onsets > 0 {
        ExitCode::DrowsinessDetected
    } else {
        ExitCode::Success
    };

    Ok(RunOutcome { summary, exit_code })
}

fn open_source(spec: &SourceSpec) -> Result<Box<dyn FrameSource>> {
    match spec {
        SourceSpec::Frames(dir) => Ok(Box::new(FsFrameSource::open(dir)?)),
        SourceSpec::Video(path) => open_video(path),
        SourceSpec::Camera(index) => open_camera(*index),
    }
}

#[cfg(feature = "camera")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    let path = path.to_string_lossy();
    Ok(Box::new(drowsy_adapters::CameraSource::open_video(&path)?))
}

#[cfg(not(feature = "camera"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "Cannot replay {}: built without camera support \
         (use --frames DIR, or rebuild with --features camera)",
        path.display()
    )
}

#[cfg(feature = "camera")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(drowsy_adapters::CameraSource::open_camera(index)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "Cannot open camera {index}: built without camera support \
         (use --frames DIR, or rebuild with --features camera)"
    )
}

#[cfg(feature = "camera")]
fn build_predictor(path: &Path) -> Result<Box<dyn LandmarkPredictor>> {
    Ok(Box::new(drowsy_adapters::FacemarkPredictor::load(path)?))
}

#[cfg(not(feature = "camera"))]
fn build_predictor(path: &Path) -> Result<Box<dyn LandmarkPredictor>> {
    anyhow::bail!(
        "Cannot load {}: landmark prediction needs OpenCV (rebuild with --features camera)",
        path.display()
    )
}

#[cfg(feature = "camera")]
fn build_display(settings: &DisplaySettings) -> Result<Box<dyn FrameDisplay>> {
    if settings.enabled {
        Ok(Box::new(drowsy_adapters::WindowDisplay::open()?))
    } else {
        Ok(Box::new(HeadlessDisplay))
    }
}

#[cfg(not(feature = "camera"))]
#[allow(clippy::unnecessary_wraps)]
fn build_display(settings: &DisplaySettings) -> Result<Box<dyn FrameDisplay>> {
    if settings.enabled {
        debug!("Built without camera support, running headless");
    }
    Ok(Box::new(HeadlessDisplay))
}

#[cfg(feature = "audio")]
fn build_alarm(settings: &AlarmSettings) -> Box<dyn Alarm> {
    if settings.mute {
        return Box::new(LogAlarm::new());
    }

    let mut alarm = match drowsy_adapters::CpalAlarm::new() {
        Ok(alarm) => alarm,
        Err(e) => {
            tracing::warn!("Audio unavailable, alarms will only be logged: {e:#}");
            return Box::new(LogAlarm::new());
        }
    };
    if let Err(e) = alarm.preload(&settings.sound) {
        tracing::warn!("Alert sound unavailable, alarms will only be logged: {e:#}");
        return Box::new(LogAlarm::new());
    }
    info!("Alarm sound: {}", settings.sound.display());
    Box::new(alarm)
}

#[cfg(not(feature = "audio"))]
fn build_alarm(settings: &AlarmSettings) -> Box<dyn Alarm> {
    if !settings.mute {
        info!(
            "Built without audio support, alarms will only be logged ({})",
            settings.sound.display()
        );
    }
    Box::new(LogAlarm::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(toml: &str) -> AppConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("0.25"), Ok(0.25));
        assert_eq!(parse_threshold("0"), Ok(0.0));
        assert!(parse_threshold("1.5").is_err());
        assert!(parse_threshold("-0.1").is_err());
        assert!(parse_threshold("abc").is_err());
    }

    #[test]
    fn test_parse_frame_count() {
        assert_eq!(parse_frame_count("20"), Ok(20));
        assert!(parse_frame_count("0").is_err());
        assert!(parse_frame_count("-3").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = RunArgs::with_config(RunArgs::default(), &AppConfig::default()).settings();
        assert!((settings.detection.ear_threshold - 0.25).abs() < f32::EPSILON);
        assert_eq!(settings.detection.consec_frames, 20);
        assert_eq!(settings.source, SourceSpec::Camera(0));
        assert_eq!(settings.alarm.sound, PathBuf::from("alert.wav"));
        assert!(!settings.alarm.mute);
        assert!(settings.display.enabled);
        assert!(settings.output.report);
        assert_eq!(settings.output.format, OutputFormat::Jsonl);
        assert!(settings.models.gpu);
    }

    #[test]
    fn test_config_applies_when_flags_absent() {
        let cfg = config(
            r"
[detection]
ear_threshold = 0.2
consec_frames = 10

[alarm]
sound = 'beep.wav'
mute = true

[capture]
camera = 2

[display]
enabled = false

[models]
gpu = false

[output]
format = 'json'
report = false
",
        );
        let settings = RunArgs::with_config(RunArgs::default(), &cfg).settings();
        assert!((settings.detection.ear_threshold - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.detection.consec_frames, 10);
        assert_eq!(settings.alarm.sound, PathBuf::from("beep.wav"));
        assert!(settings.alarm.mute);
        assert_eq!(settings.source, SourceSpec::Camera(2));
        assert!(!settings.display.enabled);
        assert!(!settings.models.gpu);
        assert_eq!(settings.output.format, OutputFormat::Json);
        assert!(!settings.output.report);
    }

    #[test]
    fn test_flags_override_config() {
        let cfg = config(
            r"
[detection]
ear_threshold = 0.2

[capture]
camera = 2

[output]
format = 'json'
",
        );
        let args = RunArgs {
            ear_threshold: Some(0.3),
            frames: Some(PathBuf::from("clip")),
            format: Some(OutputFormat::Jsonl),
            ..RunArgs::default()
        };
        let settings = RunArgs::with_config(args, &cfg).settings();
        assert!((settings.detection.ear_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.source, SourceSpec::Frames(PathBuf::from("clip")));
        assert_eq!(settings.output.format, OutputFormat::Jsonl);
    }

    #[test]
    fn test_camera_flag_beats_config_camera() {
        let cfg = config("[capture]\ncamera = 2\n");
        let args = RunArgs {
            camera: Some(1),
            ..RunArgs::default()
        };
        assert_eq!(
            RunArgs::with_config(args, &cfg).source(),
            SourceSpec::Camera(1)
        );
    }

    #[test]
    fn test_monitor_config_carries_settings() {
        let args = RunArgs {
            ear_threshold: Some(0.18),
            consec_frames: Some(3),
            min_face_confidence: Some(0.9),
            alarm: Some(PathBuf::from("siren.wav")),
            ..RunArgs::default()
        };
        let config = args.monitor_config();
        assert!((config.ear_threshold - 0.18).abs() < f32::EPSILON);
        assert_eq!(config.consec_frames, 3);
        assert!((config.min_face_confidence - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.alert_sound, PathBuf::from("siren.wav"));
        assert!(config.annotate);
    }

    #[test]
    fn test_missing_models_fail_before_capture() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            models_dir: Some(dir.path().to_path_buf()),
            frames: Some(dir.path().to_path_buf()),
            ..RunArgs::default()
        };
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("drowsy models fetch"));
    }
}
