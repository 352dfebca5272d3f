//! Frame-step target math: where a ±1-frame step should land, before the
//! seek itself is performed by `media`.

use super::framerate::FALLBACK_FRAME_SECS;

/// Stepping forward never lands exactly on the duration; ending media there
/// fires `ended` and confuses subsequent steps.
pub const SEEK_EPSILON: f64 = 1e-4;

/// Target time for a step of `dir` (±1) frames from `current`. `None` when
/// there is nothing sensible to do (no finite positive duration). A
/// degenerate frame duration falls back to 1/30.
pub fn step_target(current: f64, duration: f64, frame_secs: f64, dir: i32) -> Option<f64> {
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    let frame = if frame_secs.is_finite() && frame_secs > 0.0 {
        frame_secs
    } else {
        FALLBACK_FRAME_SECS
    };
    let upper = if dir > 0 { duration - SEEK_EPSILON } else { duration };
    let mut target = (current + frame * dir as f64).clamp(0.0, upper);
    if dir < 0 && target < SEEK_EPSILON {
        target = 0.0;
    }
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_step_advances_by_one_frame() {
        let t = step_target(10.0, 20.0, 0.04, 1).unwrap();
        assert!((t - 10.04).abs() < 1e-12);
    }

    #[test]
    fn backward_step_near_zero_snaps_to_zero() {
        let t = step_target(0.00005, 20.0, 0.04, -1).unwrap();
        assert_eq!(t, 0.0);
    }

    #[test]
    fn forward_step_near_end_stays_short_of_duration() {
        let t = step_target(19.999, 20.0, 0.04, 1).unwrap();
        assert!(t <= 20.0 - SEEK_EPSILON);
        assert_eq!(t, 20.0 - SEEK_EPSILON);
    }

    #[test]
    fn no_duration_means_no_step() {
        assert_eq!(step_target(1.0, f64::NAN, 0.04, 1), None);
        assert_eq!(step_target(1.0, f64::INFINITY, 0.04, 1), None);
        assert_eq!(step_target(1.0, 0.0, 0.04, -1), None);
    }

    #[test]
    fn degenerate_frame_duration_falls_back() {
        let t = step_target(5.0, 20.0, 0.0, 1).unwrap();
        assert!((t - (5.0 + FALLBACK_FRAME_SECS)).abs() < 1e-12);
    }
}
