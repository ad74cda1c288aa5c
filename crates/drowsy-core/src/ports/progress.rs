//! Monitoring event port for console and UI integration.

use crate::domain::{FrameReport, RunSummary};

/// Events emitted while monitoring.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A frame has been fully processed.
    FrameProcessed {
        /// The frame's report.
        report: FrameReport,
        /// Total frames in the stream, if known.
        total: Option<u64>,
    },
    /// The alarm started.
    AlarmStarted {
        /// Frame index at onset.
        frame: u64,
        /// Consecutive drowsy count at onset.
        counter: u32,
    },
    /// The alarm stopped.
    AlarmStopped {
        /// Frame index at which the eyes reopened.
        frame: u64,
    },
    /// A face was skipped because processing failed.
    FaceFailed {
        /// Frame index.
        frame: u64,
        /// Error description.
        reason: String,
    },
    /// Monitoring ended.
    Finished {
        /// Run totals.
        summary: RunSummary,
    },
}

/// Port for receiving monitoring events.
pub trait ProgressSink: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: MonitorEvent);
}
