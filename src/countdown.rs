//! Pre-test countdown sequencing.
//!
//! A test begins with a fixed scripted sequence of five audio cues. This
//! module owns only the timing: which cue is active at a given timestamp and
//! when the sequence is over. Playing tones and drawing labels is the
//! external audio/render layer's job, driven by the cue exposed in the frame
//! status. Keeping the timer here, instead of busy-waiting in a UI loop,
//! means test startup is testable without a display or an input device.

use serde::Serialize;

/// One scripted countdown cue: on-screen label, beep frequency, and how long
/// the cue stays active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cue {
    pub label: &'static str,
    pub tone_hz: u32,
    pub duration_ms: u64,
}

/// The fixed pre-test cue script.
pub const CUES: [Cue; 5] = [
    Cue {
        label: "Ready",
        tone_hz: 1000,
        duration_ms: 1000,
    },
    Cue {
        label: "3",
        tone_hz: 800,
        duration_ms: 400,
    },
    Cue {
        label: "2",
        tone_hz: 800,
        duration_ms: 400,
    },
    Cue {
        label: "1",
        tone_hz: 800,
        duration_ms: 400,
    },
    Cue {
        label: "Go",
        tone_hz: 1500,
        duration_ms: 400,
    },
];

/// Result of advancing the countdown by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// No countdown running.
    Inactive,
    /// A cue is currently active.
    Active(Cue),
    /// The final cue just elapsed; the test should activate now.
    Finished,
}

/// Timer-driven state machine walking through the cue script.
#[derive(Debug, Clone)]
pub struct Countdown {
    active: bool,
    cue_index: usize,
    cue_started_ms: u64,
}

impl Countdown {
    pub fn new() -> Self {
        Self {
            active: false,
            cue_index: 0,
            cue_started_ms: 0,
        }
    }

    /// Begin the cue script at the given timestamp.
    pub fn start(&mut self, now_ms: u64) {
        self.active = true;
        self.cue_index = 0;
        self.cue_started_ms = now_ms;
    }

    /// Cancel a running countdown.
    pub fn cancel(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The cue active right now, if any.
    pub fn current_cue(&self) -> Option<Cue> {
        if self.active {
            Some(CUES[self.cue_index.min(CUES.len() - 1)])
        } else {
            None
        }
    }

    /// Advance the script to the given timestamp.
    ///
    /// Cue boundaries are anchored to cue start times rather than frame
    /// arrival, so a slow frame skips cleanly past however many cues
    /// elapsed without accumulating drift. Returns `Finished` exactly once.
    pub fn tick(&mut self, now_ms: u64) -> CountdownStep {
        if !self.active {
            return CountdownStep::Inactive;
        }
        loop {
            let cue = CUES[self.cue_index];
            if now_ms.saturating_sub(self.cue_started_ms) < cue.duration_ms {
                return CountdownStep::Active(cue);
            }
            self.cue_started_ms += cue.duration_ms;
            self.cue_index += 1;
            if self.cue_index >= CUES.len() {
                self.active = false;
                return CountdownStep::Finished;
            }
        }
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}
