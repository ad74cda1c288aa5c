//! Mock implementations of core port traits.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, bail};
use image::{DynamicImage, RgbImage};

use drowsy_core::domain::{FaceRegion, Frame, FrameReport, Landmarks, Point};
use drowsy_core::ports::{
    Alarm, FaceDetector, FrameDisplay, FrameSource, KeyAction, LandmarkPredictor, MonitorEvent,
    ProgressSink, ResultOutput,
};

use crate::LandmarkBuilder;

/// Mock implementation of `FrameSource` for testing.
///
/// Yields pre-built frames, optionally failing at a given read, and counts
/// reads and releases for assertions.
pub struct MockFrameSource {
    frames: VecDeque<Frame>,
    total: u64,
    fail_on_read: Option<usize>,
    reads: usize,
    releases: usize,
}

impl MockFrameSource {
    /// Creates a source that yields `frames` in order, then end of stream.
    #[must_use]
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            total: frames.len() as u64,
            frames: frames.into(),
            fail_on_read: None,
            reads: 0,
            releases: 0,
        }
    }

    /// Creates a source with no frames.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Makes the `n`-th read (1-based) return an error.
    #[must_use]
    pub fn fail_on_read(mut self, n: usize) -> Self {
        self.fail_on_read = Some(n);
        self
    }

    /// Number of `read` calls so far.
    #[must_use]
    pub const fn read_count(&self) -> usize {
        self.reads
    }

    /// Number of `release` calls so far.
    #[must_use]
    pub const fn release_count(&self) -> usize {
        self.releases
    }
}

impl FrameSource for MockFrameSource {
    fn read(&mut self) -> anyhow::Result<Option<Frame>> {
        self.reads += 1;
        if self.fail_on_read == Some(self.reads) {
            bail!("simulated capture failure on read {}", self.reads);
        }
        Ok(self.frames.pop_front())
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.total)
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}

/// One scripted detector response.
#[derive(Debug, Clone)]
pub enum DetectorStep {
    /// Return these faces.
    Faces(Vec<FaceRegion>),
    /// Return an error.
    Fail,
}

/// Mock implementation of `FaceDetector` for testing.
///
/// Plays back a script of responses, then repeats a fallback.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<DetectorStep>>,
    fallback: Vec<FaceRegion>,
    calls: Mutex<usize>,
}

impl ScriptedDetector {
    /// Always returns `faces`.
    #[must_use]
    pub fn always(faces: Vec<FaceRegion>) -> Self {
        Self::scripted(Vec::new(), faces)
    }

    /// Always returns one face covering a 100x100 box at (10, 10).
    #[must_use]
    pub fn single_face() -> Self {
        Self::always(vec![face(10, 10, 100)])
    }

    /// Never finds a face.
    #[must_use]
    pub fn no_faces() -> Self {
        Self::always(Vec::new())
    }

    /// Plays `steps` in order, then returns `fallback` forever.
    #[must_use]
    pub fn scripted(steps: Vec<DetectorStep>, fallback: Vec<FaceRegion>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback,
            calls: Mutex::new(0),
        }
    }

    /// Number of `detect` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<FaceRegion>> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match step {
            Some(DetectorStep::Faces(faces)) => Ok(faces),
            Some(DetectorStep::Fail) => Err(anyhow!("simulated detector failure")),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// A square face region with full confidence.
#[must_use]
pub fn face(x: u32, y: u32, size: u32) -> FaceRegion {
    FaceRegion::new(drowsy_core::domain::BoundingBox::new(x, y, size, size))
}

/// One scripted landmark prediction.
#[derive(Debug, Clone, Copy)]
pub enum LandmarkStep {
    /// Landmarks whose eyes both measure this EAR.
    Ear(f32),
    /// Landmarks whose left eye has coincident corners.
    Degenerate,
    /// Landmarks with a NaN coordinate on the left upper lid.
    NanLid,
    /// Prediction fails.
    Fail,
}

/// Mock implementation of `LandmarkPredictor` for testing.
///
/// Each `predict` call consumes the next step; once the script runs out,
/// open eyes (EAR 0.30) are returned. Landmarks are placed at the face box.
pub struct ScriptedLandmarks {
    script: Mutex<VecDeque<LandmarkStep>>,
    calls: Mutex<usize>,
}

impl ScriptedLandmarks {
    /// Plays the given steps in order.
    #[must_use]
    pub fn new(steps: Vec<LandmarkStep>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            calls: Mutex::new(0),
        }
    }

    /// One prediction per EAR value, in order.
    #[must_use]
    pub fn from_ears(ears: impl IntoIterator<Item = f32>) -> Self {
        Self::new(ears.into_iter().map(LandmarkStep::Ear).collect())
    }

    /// Number of `predict` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LandmarkPredictor for ScriptedLandmarks {
    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, _image: &DynamicImage, region: &FaceRegion) -> anyhow::Result<Landmarks> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(LandmarkStep::Ear(0.30));

        let origin = Point::new(region.bbox.x as f32, region.bbox.y as f32);
        let builder = LandmarkBuilder::new().at(origin.x, origin.y);

        match step {
            LandmarkStep::Ear(ear) => Ok(builder.with_ear(ear).build()),
            LandmarkStep::Degenerate => Ok(builder.with_degenerate_eye().build()),
            LandmarkStep::NanLid => Ok(builder.with_nan_lid().build()),
            LandmarkStep::Fail => Err(anyhow!("simulated landmark failure")),
        }
    }
}

/// A call recorded by [`RecordingAlarm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmCall {
    /// `start_loop` with this sound.
    Start(PathBuf),
    /// `stop`.
    Stop,
}

/// Mock implementation of `Alarm` for testing.
///
/// Clones share one call log, so a test can keep a handle while the monitor
/// owns the boxed alarm.
#[derive(Clone, Default)]
pub struct RecordingAlarm {
    calls: Arc<Mutex<Vec<AlarmCall>>>,
    fail: bool,
}

impl RecordingAlarm {
    /// Creates a recording alarm.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail after being recorded.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<AlarmCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `start_loop` calls.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, AlarmCall::Start(_)))
            .count()
    }

    /// Number of `stop` calls.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, AlarmCall::Stop))
            .count()
    }

    fn record(&self, call: AlarmCall) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.fail {
            bail!("simulated audio failure");
        }
        Ok(())
    }
}

impl Alarm for RecordingAlarm {
    fn start_loop(&mut self, sound: &Path) -> anyhow::Result<()> {
        self.record(AlarmCall::Start(sound.to_path_buf()))
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.record(AlarmCall::Stop)
    }
}

/// Mock implementation of `FrameDisplay` for testing.
///
/// Records shown frame indices and keeps the last annotated image.
#[derive(Default)]
pub struct MockDisplay {
    shown: Vec<u64>,
    last: Option<RgbImage>,
    quit_after: Option<usize>,
}

impl MockDisplay {
    /// A display that never asks to quit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A display that answers `Quit` once it has shown `n` frames.
    #[must_use]
    pub fn quit_after(n: usize) -> Self {
        Self {
            quit_after: Some(n),
            ..Self::default()
        }
    }

    /// Indices of the frames shown, in order.
    #[must_use]
    pub fn shown(&self) -> &[u64] {
        &self.shown
    }

    /// The most recently shown image.
    #[must_use]
    pub const fn last_image(&self) -> Option<&RgbImage> {
        self.last.as_ref()
    }
}

impl FrameDisplay for MockDisplay {
    fn show(&mut self, index: u64, frame: &RgbImage) -> anyhow::Result<KeyAction> {
        self.shown.push(index);
        self.last = Some(frame.clone());

        if self.quit_after.is_some_and(|n| self.shown.len() >= n) {
            Ok(KeyAction::Quit)
        } else {
            Ok(KeyAction::Continue)
        }
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures reports for later assertions.
#[derive(Default)]
pub struct MockResultOutput {
    reports: Mutex<Vec<FrameReport>>,
    flush_count: Mutex<usize>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<FrameReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, report: &FrameReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
#[derive(Default)]
pub struct MockProgressSink {
    events: Mutex<Vec<MonitorEvent>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Frames on which an alarm started.
    #[must_use]
    pub fn alarm_started_frames(&self) -> Vec<u64> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::AlarmStarted { frame, .. } => Some(*frame),
                _ => None,
            })
            .collect()
    }

    /// Frames on which an alarm stopped.
    #[must_use]
    pub fn alarm_stopped_frames(&self) -> Vec<u64> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::AlarmStopped { frame } => Some(*frame),
                _ => None,
            })
            .collect()
    }

    /// Number of `FaceFailed` events.
    #[must_use]
    pub fn face_failed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, MonitorEvent::FaceFailed { .. }))
            .count()
    }

    /// Returns whether a `Finished` event was received.
    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, MonitorEvent::Finished { .. }))
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: MonitorEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
