//! Repetition counting state machine with hysteresis.
//!
//! Consumes the smoothed hip angle each frame and classifies posture against
//! two thresholds: a fixed stand threshold and a calibrated sit threshold.
//! Angles between the two cause no transition at all; that dead zone is the
//! hysteresis mechanism, so oscillation near a single boundary can never
//! generate spurious repetitions.
//!
//! A repetition is one confirmed transition into standing while a test is
//! active. The measurement clock starts at the first counted stand and stops
//! at the sit transition that follows the goal-th stand: the subject has to
//! return to sitting to finish the final rep, which is why the goal-th stand
//! only marks the finish as pending.

use crate::types::{PostureState, TestReport};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Default angle above which posture is classified as standing, in degrees.
pub const DEFAULT_STAND_THRESHOLD_DEG: f32 = 160.0;

/// Default number of sit-to-stand repetitions per test.
pub const DEFAULT_REP_GOAL: u32 = 5;

/// Configuration for the repetition counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepCounterConfig {
    /// Smoothed angle above which posture becomes `Standing`, in degrees.
    pub stand_threshold_deg: f32,
    /// Number of repetitions that completes a test.
    pub rep_goal: u32,
}

impl Default for RepCounterConfig {
    fn default() -> Self {
        Self {
            stand_threshold_deg: DEFAULT_STAND_THRESHOLD_DEG,
            rep_goal: DEFAULT_REP_GOAL,
        }
    }
}

/// Event emitted by the counter when a frame produces a state change worth
/// reporting to the session (and onwards to rendering/audio).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum RepEvent {
    /// A stand transition was counted during an active test.
    Rep { count: u32 },
    /// The goal-th rep's closing sit transition occurred; the test is over.
    TestFinished(TestReport),
}

/// Hysteresis posture classifier and test-session bookkeeper.
///
/// Posture state persists for the lifetime of the engine and is never reset
/// by test boundaries. Test-session state (rep count, start timestamp,
/// pending-finish flag) exists only between `start_test` and completion or
/// `abort_test`.
pub struct RepCounter {
    config: RepCounterConfig,

    /// Calibrated sit threshold. `None` until the first successful
    /// calibration commits one; the classifier is inert until then.
    sit_threshold_deg: Option<f32>,

    posture: PostureState,

    // Test session state
    test_active: bool,
    reps: u32,
    started_at_ms: Option<u64>,
    finish_pending: bool,

    /// Most recently completed measurement, kept for status display.
    last_result: Option<TestReport>,
}

impl RepCounter {
    pub fn new(config: RepCounterConfig) -> Self {
        Self {
            config,
            sit_threshold_deg: None,
            posture: PostureState::Unknown,
            test_active: false,
            reps: 0,
            started_at_ms: None,
            finish_pending: false,
            last_result: None,
        }
    }

    /// Commit a calibrated sit threshold.
    ///
    /// Caller (the session) guarantees the value came from a successful
    /// calibration run, i.e. it is strictly below the stand threshold.
    pub fn set_sit_threshold(&mut self, sit_threshold_deg: f32) {
        self.sit_threshold_deg = Some(sit_threshold_deg);
    }

    /// Classify one smoothed angle and apply rep/timing side effects.
    ///
    /// Inert until calibrated. Returns an event on counted reps and on test
    /// completion; plain posture transitions outside a test return nothing.
    pub fn process_angle(&mut self, now_ms: u64, smoothed_deg: f32) -> Option<RepEvent> {
        let sit_threshold = self.sit_threshold_deg?;

        if smoothed_deg > self.config.stand_threshold_deg
            && self.posture != PostureState::Standing
        {
            self.posture = PostureState::Standing;
            debug!("posture -> standing at {:.1}°", smoothed_deg);
            if self.test_active {
                self.reps += 1;
                if self.reps == 1 {
                    self.started_at_ms = Some(now_ms);
                }
                if self.reps >= self.config.rep_goal {
                    self.finish_pending = true;
                }
                info!("rep {}/{}", self.reps, self.config.rep_goal);
                return Some(RepEvent::Rep { count: self.reps });
            }
        } else if smoothed_deg < sit_threshold && self.posture != PostureState::Sitting {
            self.posture = PostureState::Sitting;
            debug!("posture -> sitting at {:.1}°", smoothed_deg);
            if self.finish_pending && self.test_active {
                let start = self.started_at_ms.unwrap_or(now_ms);
                let report = TestReport {
                    reps: self.reps,
                    duration_ms: now_ms.saturating_sub(start),
                };
                self.test_active = false;
                self.finish_pending = false;
                self.last_result = Some(report);
                info!("test complete in {:.2} s", report.duration_s());
                return Some(RepEvent::TestFinished(report));
            }
        }
        // Dead zone between the thresholds: no transition by design.

        None
    }

    /// Begin a test. Valid only when calibrated and no test is active.
    ///
    /// Resets the rep count and pending-finish flag but leaves posture
    /// untouched, so classification continues from the current posture.
    pub fn start_test(&mut self) -> bool {
        if self.sit_threshold_deg.is_none() || self.test_active {
            return false;
        }
        self.test_active = true;
        self.reps = 0;
        self.started_at_ms = None;
        self.finish_pending = false;
        info!("test active, goal {} reps", self.config.rep_goal);
        true
    }

    /// Abort an active test, discarding its partial progress.
    ///
    /// Posture and committed thresholds are left untouched.
    pub fn abort_test(&mut self) -> bool {
        if !self.test_active {
            return false;
        }
        self.test_active = false;
        self.reps = 0;
        self.started_at_ms = None;
        self.finish_pending = false;
        info!("test aborted");
        true
    }

    pub fn is_calibrated(&self) -> bool {
        self.sit_threshold_deg.is_some()
    }

    pub fn sit_threshold_deg(&self) -> Option<f32> {
        self.sit_threshold_deg
    }

    pub fn stand_threshold_deg(&self) -> f32 {
        self.config.stand_threshold_deg
    }

    pub fn posture(&self) -> PostureState {
        self.posture
    }

    pub fn test_active(&self) -> bool {
        self.test_active
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn rep_goal(&self) -> u32 {
        self.config.rep_goal
    }

    /// Most recently completed measurement, if any.
    pub fn last_result(&self) -> Option<TestReport> {
        self.last_result
    }
}

impl Default for RepCounter {
    fn default() -> Self {
        Self::new(RepCounterConfig::default())
    }
}
