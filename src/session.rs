//! Session orchestration for the five-times sit-to-stand test.
//!
//! The session controller is the single object the outside world talks to.
//! The frame loop feeds it one timestamp and an optional set of landmarks
//! per frame; the control surface (keyboard, UI buttons) issues commands;
//! rendering and audio read the status record it returns. It performs no
//! signal processing of its own beyond delegation: angle estimation,
//! smoothing, calibration, countdown sequencing, and rep counting each live
//! in their own module, and this one wires them together in the right order
//! and owns the shared state they hand back.
//!
//! Every command is total: an invalid command is acknowledged as ignored
//! with a reason, never an error and never a panic.

use crate::angle::hip_angle;
use crate::calibration::{
    CalibrationConfig, CalibrationController, CalibrationError, CalibrationPhase,
};
use crate::countdown::{Countdown, CountdownStep, Cue};
use crate::reps::{RepCounter, RepCounterConfig, RepEvent};
use crate::smoothing::{MedianFilter, DEFAULT_SMOOTHING_WINDOW};
use crate::types::{Point2, PoseLandmarks, PostureState, TestReport};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Bundled configuration for a whole session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Median filter window in frames.
    pub smoothing_window: usize,
    /// Calibration protocol parameters.
    pub calibration: CalibrationConfig,
    /// Repetition counter parameters. `stand_threshold_deg` here and in
    /// `calibration` must agree; `Default` keeps them tied.
    pub reps: RepCounterConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            calibration: CalibrationConfig::default(),
            reps: RepCounterConfig::default(),
        }
    }
}

/// Coarse phase of the overall session, for rendering and audio.
///
/// Derived from component state each frame rather than stored, so it can
/// never drift out of sync with the components it summarizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Not yet calibrated; waiting for a calibration request.
    Idle,
    /// A calibration run is pending or collecting.
    Calibrating,
    /// Calibrated and waiting for a test to start.
    Ready,
    /// Countdown cues are playing; the test activates when they finish.
    CountingDown,
    /// A test is active and reps are being counted.
    Testing,
    /// The last test completed; its result is available.
    Finished,
}

/// Acknowledgement for a command from the external control surface.
///
/// Invalid commands are ignored, not raised: the control surface may relay
/// the reason as a status line but nothing needs unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAck {
    Accepted,
    Ignored(&'static str),
}

impl CommandAck {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandAck::Accepted)
    }
}

/// Per-frame status record for the rendering/audio collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct FrameStatus {
    /// Overall session phase.
    pub phase: SessionPhase,
    /// De-jittered hip angle this frame, absent when landmarks were missing.
    pub smoothed_angle_deg: Option<f32>,
    /// Normalized hip position for anchoring the on-screen angle readout.
    /// Convert with [`Point2::to_pixel`] at the rendering boundary.
    pub hip_position: Option<Point2>,
    /// Phase of the calibration controller.
    pub calibration_phase: CalibrationPhase,
    /// Committed sit threshold, absent until calibrated.
    pub sit_threshold_deg: Option<f32>,
    /// Fixed stand threshold.
    pub stand_threshold_deg: f32,
    /// Current posture classification.
    pub posture: PostureState,
    /// Whether a test is currently active.
    pub test_active: bool,
    /// Reps counted so far in the current test.
    pub reps: u32,
    /// Reps required to complete a test.
    pub rep_goal: u32,
    /// Most recently completed measurement, if any.
    pub last_result: Option<TestReport>,
    /// Countdown cue to display/play this frame, if one is active.
    pub active_cue: Option<Cue>,
    /// Rep or completion event that fired this frame, if any.
    pub event: Option<RepEvent>,
    /// Human-readable prompt for the on-screen status line.
    pub status_message: String,
}

impl FrameStatus {
    /// Hip anchor in pixel coordinates for a frame of the given dimensions.
    pub fn hip_pixel(&self, width: u32, height: u32) -> Option<(i32, i32)> {
        self.hip_position.map(|p| p.to_pixel(width, height))
    }
}

/// Top-level controller owning the whole processing chain.
pub struct SessionController {
    filter: MedianFilter,
    calibration: CalibrationController,
    reps: RepCounter,
    countdown: Countdown,
    /// Failure of the most recent calibration run, cleared by the next
    /// request. Kept so the status line can tell the user to retry.
    last_calibration_error: Option<CalibrationError>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            filter: MedianFilter::new(config.smoothing_window),
            calibration: CalibrationController::new(config.calibration),
            reps: RepCounter::new(config.reps),
            countdown: Countdown::new(),
            last_calibration_error: None,
        }
    }

    /// Process one frame of input.
    ///
    /// `landmarks` is `None` when pose detection failed this frame; that is
    /// a normal skip, not an error: timers still advance, but no buffer and
    /// no state machine sees a sample. Must be called with monotonically
    /// non-decreasing `now_ms`.
    pub fn process_frame(
        &mut self,
        now_ms: u64,
        landmarks: Option<&PoseLandmarks>,
    ) -> FrameStatus {
        // Countdown first: test activation is time-driven and must not
        // depend on landmark visibility.
        if self.countdown.tick(now_ms) == CountdownStep::Finished {
            self.reps.start_test();
        }

        let (smoothed, hip_position) = match landmarks {
            Some(lm) => {
                let instantaneous = hip_angle(lm.shoulder, lm.hip, lm.knee);
                (Some(self.filter.observe(instantaneous)), Some(lm.hip))
            }
            None => (None, None),
        };

        // The calibration controller no-ops when idle, so it can safely see
        // every frame; it needs frames without landmarks to advance timers.
        if let Some(outcome) = self.calibration.update(now_ms, smoothed) {
            match outcome {
                Ok(result) => {
                    self.reps.set_sit_threshold(result.sit_threshold_deg);
                    self.last_calibration_error = None;
                }
                Err(err) => {
                    self.last_calibration_error = Some(err);
                }
            }
        }

        // Rep evaluation runs only when calibrated and no calibration is in
        // progress. The test-active flag gates counting inside the counter,
        // so posture tracking continues between tests and during countdown.
        let mut event = None;
        if let Some(angle) = smoothed {
            if self.reps.is_calibrated() && !self.calibration.in_progress() {
                event = self.reps.process_angle(now_ms, angle);
            }
        }

        let phase = self.phase();
        FrameStatus {
            phase,
            smoothed_angle_deg: smoothed,
            hip_position,
            calibration_phase: self.calibration.phase(),
            sit_threshold_deg: self.reps.sit_threshold_deg(),
            stand_threshold_deg: self.reps.stand_threshold_deg(),
            posture: self.reps.posture(),
            test_active: self.reps.test_active(),
            reps: self.reps.reps(),
            rep_goal: self.reps.rep_goal(),
            last_result: self.reps.last_result(),
            active_cue: self.countdown.current_cue(),
            event,
            status_message: self.status_message(now_ms, phase),
        }
    }

    /// Command: begin a calibration run.
    pub fn request_calibration(&mut self, now_ms: u64) -> CommandAck {
        if self.countdown.is_active() {
            warn!("calibration request ignored: countdown in progress");
            return CommandAck::Ignored("countdown in progress");
        }
        if self.reps.test_active() {
            warn!("calibration request ignored: test in progress");
            return CommandAck::Ignored("test in progress");
        }
        if self.calibration.request(now_ms) {
            self.last_calibration_error = None;
            CommandAck::Accepted
        } else {
            warn!("calibration request ignored: already calibrating");
            CommandAck::Ignored("calibration already in progress")
        }
    }

    /// Command: start a test.
    ///
    /// Runs the countdown first; the test itself activates when the final
    /// cue elapses during a later `process_frame`.
    pub fn start_test(&mut self, now_ms: u64) -> CommandAck {
        if !self.reps.is_calibrated() {
            warn!("start ignored: not calibrated");
            return CommandAck::Ignored("not calibrated");
        }
        if self.calibration.in_progress() {
            warn!("start ignored: calibration in progress");
            return CommandAck::Ignored("calibration in progress");
        }
        if self.countdown.is_active() || self.reps.test_active() {
            warn!("start ignored: test already in progress");
            return CommandAck::Ignored("test already in progress");
        }
        self.countdown.start(now_ms);
        info!("countdown started");
        CommandAck::Accepted
    }

    /// Command: stop a pending or active test.
    pub fn stop(&mut self) -> CommandAck {
        if self.countdown.is_active() {
            self.countdown.cancel();
            info!("countdown cancelled");
            return CommandAck::Accepted;
        }
        if self.reps.abort_test() {
            return CommandAck::Accepted;
        }
        CommandAck::Ignored("no test in progress")
    }

    /// Current overall phase, derived from component state.
    pub fn phase(&self) -> SessionPhase {
        if self.calibration.in_progress() {
            SessionPhase::Calibrating
        } else if self.countdown.is_active() {
            SessionPhase::CountingDown
        } else if self.reps.test_active() {
            SessionPhase::Testing
        } else if self.reps.last_result().is_some() {
            SessionPhase::Finished
        } else if self.reps.is_calibrated() {
            SessionPhase::Ready
        } else {
            SessionPhase::Idle
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.reps.is_calibrated()
    }

    /// Most recently completed measurement, if any.
    pub fn last_result(&self) -> Option<TestReport> {
        self.reps.last_result()
    }

    /// Failure of the most recent calibration run, if it was rejected.
    pub fn last_calibration_error(&self) -> Option<CalibrationError> {
        self.last_calibration_error
    }

    fn status_message(&self, now_ms: u64, phase: SessionPhase) -> String {
        match phase {
            SessionPhase::Idle => match self.last_calibration_error {
                Some(err) => format!("Calibration failed ({}), press 'c' to retry", err),
                None => "Press 'c' to calibrate".to_string(),
            },
            SessionPhase::Calibrating => match self.calibration.phase() {
                CalibrationPhase::Pending => "Calibration starting, sit still".to_string(),
                CalibrationPhase::Collecting => format!(
                    "Calibrating {:.1}/{:.1}s",
                    self.calibration.collection_elapsed_s(now_ms).unwrap_or(0.0),
                    self.calibration.collect_duration_s()
                ),
                CalibrationPhase::Idle => String::new(),
            },
            SessionPhase::Ready => "Press 's' to start".to_string(),
            SessionPhase::CountingDown => self
                .countdown
                .current_cue()
                .map(|cue| cue.label.to_string())
                .unwrap_or_default(),
            SessionPhase::Testing => format!(
                "Test ACTIVE, reps {}/{}",
                self.reps.reps(),
                self.reps.rep_goal()
            ),
            SessionPhase::Finished => match self.reps.last_result() {
                Some(report) => format!(
                    "Complete: {} reps in {:.2}s, press 's' to retest",
                    report.reps,
                    report.duration_s()
                ),
                None => String::new(),
            },
        }
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seated_pose() -> PoseLandmarks {
        // Trunk vertical, thigh horizontal: hip angle exactly 90°.
        PoseLandmarks::new(
            Point2::new(0.5, 0.2),
            Point2::new(0.5, 0.5),
            Point2::new(0.7, 0.5),
        )
    }

    fn standing_pose() -> PoseLandmarks {
        // Collinear vertical landmarks: hip angle 180°.
        PoseLandmarks::new(
            Point2::new(0.5, 0.2),
            Point2::new(0.5, 0.5),
            Point2::new(0.5, 0.8),
        )
    }

    /// Feed `count` frames of the same pose at ~30 fps, returning the last
    /// status and the advanced clock.
    fn feed(
        session: &mut SessionController,
        mut now_ms: u64,
        pose: Option<&PoseLandmarks>,
        count: usize,
    ) -> (FrameStatus, u64) {
        let mut status = None;
        for _ in 0..count {
            now_ms += 33;
            status = Some(session.process_frame(now_ms, pose));
        }
        (status.expect("count must be nonzero"), now_ms)
    }

    /// Drive a session through a full successful calibration.
    fn calibrate(session: &mut SessionController, start_ms: u64) -> u64 {
        assert!(session.request_calibration(start_ms).is_accepted());
        let pose = seated_pose();
        // 2 s delay + 3 s collection at 33 ms/frame, with slack.
        let (status, now_ms) = feed(session, start_ms, Some(&pose), 160);
        assert!(status.sit_threshold_deg.is_some(), "calibration incomplete");
        now_ms
    }

    #[test]
    fn test_initial_state_idle_and_inert() {
        let mut session = SessionController::default();
        let status = session.process_frame(0, None);
        assert_eq!(status.phase, SessionPhase::Idle);
        assert_eq!(status.smoothed_angle_deg, None);
        assert_eq!(status.posture, PostureState::Unknown);
        assert_eq!(status.status_message, "Press 'c' to calibrate");
    }

    #[test]
    fn test_calibration_commits_personalized_threshold() {
        let mut session = SessionController::default();
        calibrate(&mut session, 0);
        let sit = session
            .process_frame(10_000, None)
            .sit_threshold_deg
            .unwrap();
        assert!((sit - 95.0).abs() < 1e-3);
        assert_eq!(session.phase(), SessionPhase::Ready);
    }

    #[test]
    fn test_start_test_rejected_before_calibration() {
        let mut session = SessionController::default();
        assert_eq!(
            session.start_test(0),
            CommandAck::Ignored("not calibrated")
        );
    }

    #[test]
    fn test_countdown_precedes_test_activation() {
        let mut session = SessionController::default();
        let now_ms = calibrate(&mut session, 0);
        assert!(session.start_test(now_ms).is_accepted());

        let pose = seated_pose();
        let status = session.process_frame(now_ms + 33, Some(&pose));
        assert_eq!(status.phase, SessionPhase::CountingDown);
        assert_eq!(status.active_cue.unwrap().label, "Ready");
        assert!(!status.test_active);

        // After the 2600 ms script, the test is live.
        let status = session.process_frame(now_ms + 2700, Some(&pose));
        assert_eq!(status.phase, SessionPhase::Testing);
        assert!(status.test_active);
        assert_eq!(status.reps, 0);
    }

    #[test]
    fn test_commands_rejected_during_countdown() {
        let mut session = SessionController::default();
        let now_ms = calibrate(&mut session, 0);
        session.start_test(now_ms);
        assert!(!session.start_test(now_ms + 100).is_accepted());
        assert!(!session.request_calibration(now_ms + 100).is_accepted());
    }

    #[test]
    fn test_stop_cancels_countdown() {
        let mut session = SessionController::default();
        let now_ms = calibrate(&mut session, 0);
        session.start_test(now_ms);
        assert!(session.stop().is_accepted());
        let status = session.process_frame(now_ms + 33, None);
        assert_ne!(status.phase, SessionPhase::CountingDown);
        assert!(!status.test_active);
    }

    #[test]
    fn test_stop_without_test_is_ignored() {
        let mut session = SessionController::default();
        assert_eq!(session.stop(), CommandAck::Ignored("no test in progress"));
    }

    #[test]
    fn test_missing_landmarks_leave_state_unchanged() {
        let mut session = SessionController::default();
        let now_ms = calibrate(&mut session, 0);
        let before = session.process_frame(now_ms + 33, None);
        let after = session.process_frame(now_ms + 66, None);
        assert_eq!(before.posture, after.posture);
        assert_eq!(before.sit_threshold_deg, after.sit_threshold_deg);
        assert_eq!(before.reps, after.reps);
        assert_eq!(after.smoothed_angle_deg, None);
        assert_eq!(after.hip_position, None);
    }

    #[test]
    fn test_degenerate_calibration_blocks_start() {
        let mut session = SessionController::default();
        // Near-standing "seated" pose: baseline 180° → sit threshold 185°.
        assert!(session.request_calibration(0).is_accepted());
        let pose = standing_pose();
        let (status, now_ms) = feed(&mut session, 0, Some(&pose), 160);
        assert_eq!(status.sit_threshold_deg, None);
        assert!(session.last_calibration_error().is_some());
        assert!(!session.start_test(now_ms).is_accepted());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_calibration_failure_message_prompts_retry() {
        let mut session = SessionController::default();
        session.request_calibration(0);
        let pose = standing_pose();
        let (_, now_ms) = feed(&mut session, 0, Some(&pose), 160);
        let status = session.process_frame(now_ms + 33, None);
        assert!(status.status_message.contains("retry"));
    }

    #[test]
    fn test_hip_pixel_conversion() {
        let mut session = SessionController::default();
        let pose = seated_pose();
        let status = session.process_frame(33, Some(&pose));
        assert_eq!(status.hip_pixel(640, 480), Some((320, 240)));
    }
}
