//! Core data types for the sit-to-stand test engine.
//!
//! This module defines the fundamental types shared across the processing
//! pipeline. All types are small, copyable where possible, and designed to
//! make intent obvious: if a concept exists, it gets a type. Raw tuples are
//! never passed across module boundaries.
//!
//! The engine consumes pose landmarks and a caller-supplied monotonic
//! timestamp each frame; it never reads a clock itself and never assumes a
//! fixed frame interval.

use serde::{Deserialize, Serialize};

/// A 2-D point in normalized image coordinates.
///
/// Both components are in [0.0, 1.0] relative to the frame dimensions.
/// Keeping landmarks normalized makes the core independent of capture
/// resolution; conversion to pixels happens only at the rendering boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Convert to pixel coordinates for a frame of the given dimensions.
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        ((self.x * width as f32) as i32, (self.y * height as f32) as i32)
    }
}

/// The three landmarks the hip-angle estimator needs for one frame.
///
/// This is the minimal input contract with the pose-estimation collaborator.
/// Landmark geometry is trusted input: the engine does not validate that the
/// points form a plausible human silhouette, only that they are present.
/// A frame where detection failed is represented by the absence of this
/// record, which is a safe no-op for every downstream component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseLandmarks {
    /// Shoulder position (normalized).
    pub shoulder: Point2,
    /// Hip position (normalized). Also used as the on-screen angle anchor.
    pub hip: Point2,
    /// Knee position (normalized).
    pub knee: Point2,
}

impl PoseLandmarks {
    pub fn new(shoulder: Point2, hip: Point2, knee: Point2) -> Self {
        Self {
            shoulder,
            hip,
            knee,
        }
    }
}

/// Binary posture classification with an explicit pre-classification state.
///
/// `Unknown` exists from program start until the first confident
/// classification. The state is mutated only by the repetition state machine
/// and persists across tests: starting a new test never resets posture, so
/// classification continues seamlessly from whatever posture the subject is
/// currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostureState {
    /// No confident classification yet (before the first threshold crossing).
    Unknown,
    /// Smoothed angle last crossed below the sit threshold.
    Sitting,
    /// Smoothed angle last crossed above the stand threshold.
    Standing,
}

impl PostureState {
    /// Static string form for logs and UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostureState::Unknown => "unknown",
            PostureState::Sitting => "sitting",
            PostureState::Standing => "standing",
        }
    }
}

/// Result of one completed five-times sit-to-stand measurement.
///
/// The clock spans from the first stand detection to the sit detection that
/// follows the goal-th stand detection: it starts when the subject begins
/// rising for the first time and stops when they sit back down after the
/// final rise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestReport {
    /// Number of repetitions counted (equals the configured goal).
    pub reps: u32,
    /// Elapsed time of the measurement in milliseconds.
    pub duration_ms: u64,
}

impl TestReport {
    /// Elapsed time in seconds, for display.
    pub fn duration_s(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}
