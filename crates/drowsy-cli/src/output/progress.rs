//! Progress reporting adapter using indicatif.

use drowsy_core::{MonitorEvent, ProgressSink, StopReason};
use indicatif::{ProgressBar, ProgressStyle};

/// Console reporter for monitoring events.
///
/// With a bar, alarm notices are printed above it; without one they go
/// straight to stderr.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ProgressReporter {
    /// Creates a new reporter.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of frames, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise only alarm notices
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = show_bar.then(|| {
            let bar = total.map_or_else(ProgressBar::new_spinner, ProgressBar::new);
            let template = if total.is_some() {
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}"
            } else {
                "{spinner:.green} [{elapsed_precise}] {pos} frames {msg}"
            };
            if let Ok(style) = ProgressStyle::default_bar().template(template) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self { bar, quiet }
    }

    fn notice(&self, message: &str) {
        match &self.bar {
            Some(bar) => bar.println(message),
            None => eprintln!("{message}"),
        }
    }
}

impl ProgressSink for ProgressReporter {
    fn on_event(&self, event: MonitorEvent) {
        if self.quiet {
            return;
        }

        match event {
            MonitorEvent::FrameProcessed { report, total } => {
                if let Some(bar) = &self.bar {
                    if let Some(t) = total {
                        bar.set_length(t);
                    }
                    bar.set_position(report.frame);
                }
            }
            MonitorEvent::AlarmStarted { frame, counter } => {
                self.notice(&format!(
                    "DROWSINESS ALERT at frame {frame} ({counter} drowsy frames)"
                ));
                if let Some(bar) = &self.bar {
                    bar.set_message("ALARM");
                }
            }
            MonitorEvent::AlarmStopped { frame } => {
                self.notice(&format!("Alarm cleared at frame {frame}"));
                if let Some(bar) = &self.bar {
                    bar.set_message("");
                }
            }
            MonitorEvent::FaceFailed { frame, reason } => {
                if self.bar.is_none() {
                    eprintln!("WARN: Frame {frame}: skipped face: {reason}");
                }
            }
            MonitorEvent::Finished { summary } => {
                let ended = match summary.stop_reason {
                    StopReason::EndOfStream => "end of stream",
                    StopReason::QuitRequested => "quit",
                };
                let message = format!(
                    "Done ({ended}): {} frames, {} faces, {} skipped, {} alarm(s)",
                    summary.frames, summary.faces, summary.failed_faces, summary.alarm_onsets
                );
                match &self.bar {
                    Some(bar) => bar.finish_with_message(message),
                    None => eprintln!("{message}"),
                }
            }
        }
    }
}
