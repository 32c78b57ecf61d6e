//! Sit-to-Stand Test Engine
//!
//! Demo binary: drives the session controller with a synthetic landmark
//! stream standing in for the camera/pose-estimation collaborators, and
//! logs the status stream a real frame loop would hand to rendering.

use anyhow::Result;
use sts_sensing::session::{SessionController, SessionPhase};
use sts_sensing::types::{Point2, PoseLandmarks};

const FRAME_MS: u64 = 33;

fn seated_pose() -> PoseLandmarks {
    PoseLandmarks::new(
        Point2::new(0.5, 0.2),
        Point2::new(0.5, 0.5),
        Point2::new(0.7, 0.5),
    )
}

fn standing_pose() -> PoseLandmarks {
    PoseLandmarks::new(
        Point2::new(0.5, 0.2),
        Point2::new(0.5, 0.5),
        Point2::new(0.5, 0.8),
    )
}

fn main() -> Result<()> {
    env_logger::init();

    let mut session = SessionController::default();
    let mut now_ms: u64 = 0;
    let seated = seated_pose();
    let standing = standing_pose();

    // Calibrate against a seated subject.
    session.request_calibration(now_ms);
    loop {
        now_ms += FRAME_MS;
        let status = session.process_frame(now_ms, Some(&seated));
        if status.phase != SessionPhase::Calibrating {
            println!(
                "calibrated: sit threshold {:.1}°, stand threshold {:.1}°",
                status.sit_threshold_deg.unwrap_or(f32::NAN),
                status.stand_threshold_deg
            );
            break;
        }
    }

    // Countdown, then five sit-to-stand cycles.
    session.start_test(now_ms);
    let mut last_cue = "";
    while session.phase() == SessionPhase::CountingDown {
        now_ms += FRAME_MS;
        let status = session.process_frame(now_ms, Some(&seated));
        if let Some(cue) = status.active_cue {
            if cue.label != last_cue {
                println!("cue: {} ({} Hz, {} ms)", cue.label, cue.tone_hz, cue.duration_ms);
                last_cue = cue.label;
            }
        }
    }

    while session.phase() == SessionPhase::Testing {
        for _ in 0..15 {
            now_ms += FRAME_MS;
            session.process_frame(now_ms, Some(&standing));
        }
        for _ in 0..15 {
            now_ms += FRAME_MS;
            let status = session.process_frame(now_ms, Some(&seated));
            if let Some(event) = status.event {
                log::info!("event: {:?}", event);
            }
        }
    }

    if let Some(report) = session.last_result() {
        println!(
            "5xSTS complete: {} reps in {:.2} s",
            report.reps,
            report.duration_s()
        );
    }

    Ok(())
}
