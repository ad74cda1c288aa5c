//! The per-frame monitoring loop.
//!
//! Sequences capture, face detection, landmark prediction, classification,
//! state update, annotation and display once per frame. Every face is
//! processed inside one fault boundary: an error anywhere in landmark
//! prediction, annotation or classification skips that face and nothing else.

mod annotate;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{
    AlarmTransition, DrowsinessTracker, EyeClassifier, EyeReading, FaceReport, FaceRegion, Frame,
    FrameDimensions, FrameReport, RunSummary, StopReason,
};
use crate::ports::{
    Alarm, FaceDetector, FrameDisplay, FrameSource, KeyAction, LandmarkPredictor, MonitorEvent,
    ProgressSink, ResultOutput,
};

pub use annotate::{draw_eye_markers, MARKER_COLOR, MARKER_RADIUS};
pub use config::{MonitorConfig, DEFAULT_ALERT_SOUND};

/// Result of processing a single frame.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// What happened in the frame.
    pub report: FrameReport,
    /// The frame with landmark markers drawn on it.
    pub annotated: RgbImage,
}

/// Releases the wrapped frame source when dropped, whichever way the loop exits.
struct Capture<'a> {
    source: &'a mut dyn FrameSource,
}

impl Capture<'_> {
    fn read(&mut self) -> Result<Option<Frame>> {
        self.source.read()
    }
}

impl Drop for Capture<'_> {
    fn drop(&mut self) {
        debug!("Releasing frame source");
        self.source.release();
    }
}

/// Drowsiness monitor.
///
/// Owns the detection capabilities, the alarm and the tracker state; frame
/// sources and displays are lent to [`Monitor::run`].
pub struct Monitor {
    config: MonitorConfig,
    classifier: EyeClassifier,
    tracker: DrowsinessTracker,
    detector: Box<dyn FaceDetector>,
    predictor: Box<dyn LandmarkPredictor>,
    alarm: Box<dyn Alarm>,
    output: Option<Arc<dyn ResultOutput>>,
    progress: Option<Arc<dyn ProgressSink>>,
    totals: Totals,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    frames: u64,
    faces: u64,
    failed_faces: u64,
    alarm_onsets: u64,
}

impl Monitor {
    /// Creates a monitor.
    #[must_use]
    pub fn new(
        config: MonitorConfig,
        detector: Box<dyn FaceDetector>,
        predictor: Box<dyn LandmarkPredictor>,
        alarm: Box<dyn Alarm>,
    ) -> Self {
        Self {
            classifier: EyeClassifier::new(config.ear_threshold),
            tracker: DrowsinessTracker::new(config.consec_frames),
            config,
            detector,
            predictor,
            alarm,
            output: None,
            progress: None,
            totals: Totals::default(),
        }
    }

    /// Sends every frame report to `output`.
    #[must_use]
    pub fn with_output(mut self, output: Arc<dyn ResultOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Sends monitoring events to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The drowsiness tracker.
    #[must_use]
    pub const fn tracker(&self) -> &DrowsinessTracker {
        &self.tracker
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Runs until the source is exhausted or the display asks to quit.
    ///
    /// The source is released and a sounding alarm silenced on every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to read, the display fails, or
    /// a report cannot be written.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        display: &mut dyn FrameDisplay,
    ) -> Result<RunSummary> {
        let total = source.len_hint();
        info!("Monitoring started (frames: {total:?})");

        let outcome = {
            let mut capture = Capture { source };
            self.run_loop(&mut capture, display, total)
        };

        if self.tracker.alarm_on() {
            debug!("Silencing alarm on shutdown");
            if let Err(e) = self.alarm.stop() {
                warn!("Failed to stop alarm: {e:#}");
            }
        }

        let stop_reason = outcome?;

        if let Some(output) = &self.output {
            output.flush()?;
        }

        let summary = RunSummary {
            frames: self.totals.frames,
            faces: self.totals.faces,
            failed_faces: self.totals.failed_faces,
            alarm_onsets: self.totals.alarm_onsets,
            stop_reason,
        };

        info!(
            "Monitoring finished: {} frames, {} alarm(s), {:?}",
            summary.frames, summary.alarm_onsets, summary.stop_reason
        );
        self.emit(MonitorEvent::Finished { summary });

        Ok(summary)
    }

    fn run_loop(
        &mut self,
        capture: &mut Capture<'_>,
        display: &mut dyn FrameDisplay,
        total: Option<u64>,
    ) -> Result<StopReason> {
        loop {
            let Some(frame) = capture.read().context("Failed to read frame")? else {
                info!("End of stream");
                return Ok(StopReason::EndOfStream);
            };

            let outcome = self.process_frame(&frame)?;

            self.emit(MonitorEvent::FrameProcessed {
                report: outcome.report,
                total,
            });

            if display.show(frame.index, &outcome.annotated)? == KeyAction::Quit {
                info!("Quit requested");
                return Ok(StopReason::QuitRequested);
            }
        }
    }

    /// Processes one frame: detect, analyse each face, update state, annotate.
    ///
    /// # Errors
    ///
    /// Returns an error only if the frame report cannot be written; face
    /// and detector failures are logged and skipped.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutcome> {
        self.tracker.begin_frame();
        self.totals.frames += 1;

        let mut canvas = frame.image.to_rgb8();
        let regions = self.detect(frame);

        let mut faces = Vec::with_capacity(regions.len());
        let mut failed_faces = 0;
        let mut alarms = Vec::new();

        for region in regions {
            match self.analyze_face(frame, &region, &mut canvas) {
                Ok(reading) => {
                    trace!(
                        "Frame {}: ear={:.3} drowsy={}",
                        frame.index,
                        reading.ear,
                        reading.drowsy
                    );
                    if let Some(transition) = self.tracker.observe(reading.drowsy) {
                        self.apply(transition, frame.index);
                        alarms.push(transition);
                    }
                    faces.push(FaceReport {
                        bbox: region.bbox,
                        confidence: region.confidence,
                        reading,
                    });
                }
                Err(e) => {
                    error!("Error in drowsiness detection: {e:#}");
                    failed_faces += 1;
                    self.emit(MonitorEvent::FaceFailed {
                        frame: frame.index,
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        self.totals.faces += faces.len() as u64;
        self.totals.failed_faces += failed_faces as u64;

        let report = FrameReport {
            frame: frame.index,
            source: frame.source.clone(),
            timestamp: iso_timestamp(),
            dimensions: FrameDimensions::new(frame.width(), frame.height()),
            faces,
            failed_faces,
            counter: self.tracker.counter(),
            phase: self.tracker.phase(),
            alarms,
        };

        if let Some(output) = &self.output {
            output.write(&report)?;
        }

        Ok(FrameOutcome {
            report,
            annotated: canvas,
        })
    }

    /// Runs the detector, treating a failure as an empty frame.
    fn detect(&self, frame: &Frame) -> Vec<FaceRegion> {
        let regions = match self.detector.detect(&frame.image) {
            Ok(regions) => regions,
            Err(e) => {
                error!("Face detection failed on frame {}: {e:#}", frame.index);
                return Vec::new();
            }
        };

        debug!("Frame {}: {} face(s)", frame.index, regions.len());

        regions
            .into_iter()
            .filter(|r| {
                let keep = r.confidence >= self.config.min_face_confidence;
                if !keep {
                    debug!("Skipping low-confidence face: {:.2}", r.confidence);
                }
                keep
            })
            .collect()
    }

    /// The per-face fault boundary.
    fn analyze_face(
        &self,
        frame: &Frame,
        region: &FaceRegion,
        canvas: &mut RgbImage,
    ) -> Result<EyeReading> {
        let landmarks = self
            .predictor
            .predict(&frame.image, region)
            .context("Landmark prediction failed")?;

        if self.config.annotate {
            draw_eye_markers(canvas, &landmarks);
        }

        let reading = self.classifier.classify(&landmarks)?;
        Ok(reading)
    }

    /// Drives the alarm for a tracker transition.
    fn apply(&mut self, transition: AlarmTransition, frame: u64) {
        match transition {
            AlarmTransition::Started => {
                info!("drowsiness detected!");
                self.totals.alarm_onsets += 1;
                if let Err(e) = self.alarm.start_loop(&self.config.alert_sound) {
                    error!("Failed to start alarm: {e:#}");
                }
                self.emit(MonitorEvent::AlarmStarted {
                    frame,
                    counter: self.tracker.counter(),
                });
            }
            AlarmTransition::Stopped => {
                info!("Eyes open again, alarm off");
                if let Err(e) = self.alarm.stop() {
                    error!("Failed to stop alarm: {e:#}");
                }
                self.emit(MonitorEvent::AlarmStopped { frame });
            }
        }
    }

    fn emit(&self, event: MonitorEvent) {
        if let Some(progress) = &self.progress {
            progress.on_event(event);
        }
    }
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
