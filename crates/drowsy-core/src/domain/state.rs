//! Consecutive-frame drowsiness tracking and alarm control.
//!
//! The tracker holds the only state that outlives a frame: the count of
//! consecutive drowsy observations and whether the alarm is sounding.
//! State is shared by every face in view; no per-face identity is kept, so
//! with several faces the last one processed in a frame decides.

use serde::{Deserialize, Serialize};

/// Default number of consecutive drowsy frames before the alarm sounds.
pub const DEFAULT_CONSEC_FRAMES: u32 = 20;

/// Coarse view of the tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Eyes open, counter at zero.
    Awake,
    /// Eyes closed for fewer than the required frames.
    Accumulating,
    /// Alarm sounding.
    Alarmed,
}

/// Alarm change requested by an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmTransition {
    /// The alarm must start.
    Started,
    /// The alarm must stop.
    Stopped,
}

/// Drowsiness counter and alarm flag.
#[derive(Debug, Clone)]
pub struct DrowsinessTracker {
    consec_frames: u32,
    counter: u32,
    alarm_on: bool,
    signalled_this_frame: bool,
}

impl Default for DrowsinessTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CONSEC_FRAMES)
    }
}

impl DrowsinessTracker {
    /// Creates a tracker that alarms after `consec_frames` drowsy observations.
    ///
    /// A value of zero is treated as one.
    #[must_use]
    pub fn new(consec_frames: u32) -> Self {
        Self {
            consec_frames: consec_frames.max(1),
            counter: 0,
            alarm_on: false,
            signalled_this_frame: false,
        }
    }

    /// Marks the start of a new frame.
    pub fn begin_frame(&mut self) {
        self.signalled_this_frame = false;
    }

    /// Feeds one face's classification into the tracker.
    pub fn observe(&mut self, drowsy: bool) -> Option<AlarmTransition> {
        if drowsy {
            self.counter = self.counter.saturating_add(1);
            if self.counter >= self.consec_frames && !self.alarm_on && !self.signalled_this_frame
            {
                self.alarm_on = true;
                self.signalled_this_frame = true;
                return Some(AlarmTransition::Started);
            }
            None
        } else {
            self.counter = 0;
            if self.alarm_on {
                self.alarm_on = false;
                return Some(AlarmTransition::Stopped);
            }
            None
        }
    }

    /// Consecutive drowsy observations so far.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Whether the alarm is sounding.
    #[must_use]
    pub const fn alarm_on(&self) -> bool {
        self.alarm_on
    }

    /// Required consecutive observations.
    #[must_use]
    pub const fn consec_frames(&self) -> u32 {
        self.consec_frames
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        if self.alarm_on {
            Phase::Alarmed
        } else if self.counter == 0 {
            Phase::Awake
        } else {
            Phase::Accumulating
        }
    }
}
