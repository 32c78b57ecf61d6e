//! Sit-to-Stand Test Engine Library
//!
//! Turns a noisy per-frame hip-angle signal, derived from body-pose
//! landmarks, into a reliable five-times sit-to-stand repetition count and
//! elapsed-time measurement, after learning a person-specific seated
//! baseline.
//!
//! # Design Philosophy
//!
//! - **Failure is a value**: missing landmarks, degenerate calibration runs,
//!   and invalid commands are typed outcomes, never exceptions or panics.
//! - **Hysteresis over cleverness**: posture transitions only occur outside
//!   a dead zone between two thresholds, so boundary jitter can never
//!   manufacture repetitions.
//! - **Caller owns the clock**: every frame carries a monotonic timestamp;
//!   the engine never reads time itself and never assumes a frame rate.
//! - **Single writer**: all state lives behind one session controller,
//!   driven synchronously from the frame loop. No locking, no threads.
//!
//! # Example
//!
//! ```ignore
//! use sts_sensing::session::SessionController;
//! use sts_sensing::types::{Point2, PoseLandmarks};
//!
//! let mut session = SessionController::default();
//! session.request_calibration(now_ms);
//!
//! // Per frame, from the pose-estimation collaborator:
//! let landmarks = PoseLandmarks::new(shoulder, hip, knee);
//! let status = session.process_frame(now_ms, Some(&landmarks));
//! // Hand `status` to rendering/audio.
//! ```

pub mod angle;
pub mod calibration;
pub mod countdown;
pub mod reps;
pub mod session;
pub mod smoothing;
pub mod types;


// Re-export commonly used types
pub use calibration::{CalibrationConfig, CalibrationError, CalibrationPhase, CalibrationResult};
pub use countdown::{Countdown, CountdownStep, Cue};
pub use reps::{RepCounter, RepCounterConfig, RepEvent};
pub use session::{CommandAck, FrameStatus, SessionConfig, SessionController, SessionPhase};
pub use smoothing::MedianFilter;
pub use types::{Point2, PoseLandmarks, PostureState, TestReport};
