//! Seated-baseline calibration and sit-threshold derivation.
//!
//! Before a test can run, the engine learns the subject's personal seated
//! hip angle. Calibration is a short timed protocol:
//!
//! 1. A request arms the controller but waits out a fixed entry delay so the
//!    subject can settle into seated posture after pressing the control.
//!    In-transit postures would otherwise contaminate the baseline.
//! 2. Smoothed angles are then collected for a fixed window.
//! 3. The baseline is the median of the collected samples; the sit threshold
//!    is baseline + margin.
//!
//! A run that collects no samples (total landmark loss) or derives a sit
//! threshold at or above the stand threshold is rejected with a typed error:
//! previously committed thresholds are left untouched and the controller
//! returns to a requestable idle state. Failure is a value here, never a
//! panic and never a NaN threshold propagated downstream.

use crate::reps::DEFAULT_STAND_THRESHOLD_DEG;
use crate::smoothing::median;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the calibration protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Delay between the calibration request and the start of sample
    /// collection, in milliseconds. Lets the subject settle into the chair.
    pub entry_delay_ms: u64,

    /// Length of the sample-collection window in milliseconds.
    pub collect_duration_ms: u64,

    /// Margin added to the seated baseline to form the sit threshold, in
    /// degrees. The subject only has to rise this far above their seated
    /// angle before the classifier stops calling the posture "sitting".
    pub sit_margin_deg: f32,

    /// Upper bound the derived sit threshold must stay strictly below.
    /// Must match the repetition counter's stand threshold, otherwise the
    /// hysteresis dead zone between the two thresholds collapses.
    pub stand_threshold_deg: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            entry_delay_ms: 2000,
            collect_duration_ms: 3000,
            sit_margin_deg: 5.0,
            stand_threshold_deg: DEFAULT_STAND_THRESHOLD_DEG,
        }
    }
}

/// Why a calibration run was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CalibrationError {
    /// No angle samples arrived during the whole collection window,
    /// e.g. the pose was never detected.
    #[error("no angle samples collected during the calibration window")]
    EmptyWindow,

    /// The derived sit threshold is not strictly below the stand threshold.
    /// The subject was likely never fully seated, or already near standing.
    #[error(
        "derived sit threshold {sit_threshold_deg:.1}° is not below the \
         stand threshold {stand_threshold_deg:.1}°"
    )]
    DegenerateBaseline {
        sit_threshold_deg: f32,
        stand_threshold_deg: f32,
    },
}

/// Committed output of a successful calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationResult {
    /// Median seated hip angle over the collection window, in degrees.
    pub baseline_deg: f32,
    /// Sit-detection threshold: baseline + margin, in degrees.
    pub sit_threshold_deg: f32,
}

/// Externally visible calibration phase, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalibrationPhase {
    /// No run in progress; a request is accepted.
    Idle,
    /// Requested; waiting out the entry delay.
    Pending,
    /// Actively collecting smoothed-angle samples.
    Collecting,
}

enum Phase {
    Idle,
    Pending { requested_at_ms: u64 },
    Collecting { started_at_ms: u64, samples: Vec<f32> },
}

/// State machine driving one calibration run at a time.
///
/// The controller owns only transient run state. Committed thresholds live
/// with the consumer (the session hands them to the repetition counter), so
/// a failed run can simply drop its transient state without touching them.
pub struct CalibrationController {
    config: CalibrationConfig,
    phase: Phase,
}

impl CalibrationController {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
        }
    }

    /// Request a calibration run.
    ///
    /// Valid only from idle; re-requesting while a run is pending or
    /// collecting is an ignored no-op (returns false) so overlapping runs
    /// cannot exist and the original request time is preserved.
    pub fn request(&mut self, now_ms: u64) -> bool {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Pending {
                    requested_at_ms: now_ms,
                };
                info!(
                    "calibration requested, collection starts in {} ms",
                    self.config.entry_delay_ms
                );
                true
            }
            Phase::Pending { .. } | Phase::Collecting { .. } => false,
        }
    }

    /// Advance the run by one frame.
    ///
    /// `smoothed_angle` is the frame's de-jittered angle, or `None` when
    /// landmarks were missing; missing frames advance timers but contribute
    /// no samples. Returns `Some(outcome)` exactly once per run, on the
    /// frame the collection window closes; the controller is idle again
    /// afterwards either way.
    pub fn update(
        &mut self,
        now_ms: u64,
        smoothed_angle: Option<f32>,
    ) -> Option<Result<CalibrationResult, CalibrationError>> {
        // Entry delay expiry: start collecting with a fresh sample buffer.
        if let Phase::Pending { requested_at_ms } = self.phase {
            if now_ms.saturating_sub(requested_at_ms) >= self.config.entry_delay_ms {
                self.phase = Phase::Collecting {
                    started_at_ms: now_ms,
                    samples: Vec::new(),
                };
                info!("calibration collection started");
            }
        }

        if let Phase::Collecting {
            started_at_ms,
            ref mut samples,
        } = self.phase
        {
            if let Some(angle) = smoothed_angle {
                samples.push(angle);
            }

            if now_ms.saturating_sub(started_at_ms) >= self.config.collect_duration_ms {
                let outcome = Self::derive(&self.config, samples);
                self.phase = Phase::Idle;
                match &outcome {
                    Ok(result) => info!(
                        "calibrated: baseline {:.1}°, sit threshold {:.1}°",
                        result.baseline_deg, result.sit_threshold_deg
                    ),
                    Err(err) => warn!("calibration rejected: {}", err),
                }
                return Some(outcome);
            }
            debug!("calibration samples collected: {}", samples.len());
        }

        None
    }

    fn derive(
        config: &CalibrationConfig,
        samples: &[f32],
    ) -> Result<CalibrationResult, CalibrationError> {
        let baseline_deg = median(samples).ok_or(CalibrationError::EmptyWindow)?;
        let sit_threshold_deg = baseline_deg + config.sit_margin_deg;
        if sit_threshold_deg >= config.stand_threshold_deg {
            return Err(CalibrationError::DegenerateBaseline {
                sit_threshold_deg,
                stand_threshold_deg: config.stand_threshold_deg,
            });
        }
        Ok(CalibrationResult {
            baseline_deg,
            sit_threshold_deg,
        })
    }

    /// Current phase for status reporting.
    pub fn phase(&self) -> CalibrationPhase {
        match self.phase {
            Phase::Idle => CalibrationPhase::Idle,
            Phase::Pending { .. } => CalibrationPhase::Pending,
            Phase::Collecting { .. } => CalibrationPhase::Collecting,
        }
    }

    /// True while a run is pending or collecting.
    pub fn in_progress(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Seconds elapsed in the collection window, for progress display.
    pub fn collection_elapsed_s(&self, now_ms: u64) -> Option<f32> {
        match self.phase {
            Phase::Collecting { started_at_ms, .. } => {
                Some(now_ms.saturating_sub(started_at_ms) as f32 / 1000.0)
            }
            _ => None,
        }
    }

    /// Total length of the collection window in seconds.
    pub fn collect_duration_s(&self) -> f32 {
        self.config.collect_duration_ms as f32 / 1000.0
    }
}
