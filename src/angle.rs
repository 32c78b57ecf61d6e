//! Instantaneous hip-joint angle from pose landmarks.
//!
//! The hip angle is the angle at the hip vertex between the hip→shoulder
//! and hip→knee rays, computed as the difference of the two ray headings
//! (atan2 form). Reflex results are folded so the value always lies in
//! [0°, 180°]: roughly 90° for a seated trunk-over-thigh pose, approaching
//! 180° when standing upright.
//!
//! This is a pure function of one frame's landmarks. Jitter suppression is
//! the smoothing filter's job, not this module's.

use crate::types::Point2;

/// Compute the hip angle in degrees from shoulder, hip, and knee landmarks.
///
/// Total for all inputs: coincident landmarks degenerate to a heading
/// difference of zero rather than an error, since `atan2(0, 0)` is defined.
/// Garbage geometry therefore yields a garbage-but-finite angle, which the
/// calibration margin and hysteresis dead zone absorb downstream.
pub fn hip_angle(shoulder: Point2, hip: Point2, knee: Point2) -> f32 {
    let rad = (knee.y - hip.y).atan2(knee.x - hip.x)
        - (shoulder.y - hip.y).atan2(shoulder.x - hip.x);
    let deg = rad.to_degrees().abs();
    if deg > 180.0 {
        360.0 - deg
    } else {
        deg
    }
}
