//! Target-progress arithmetic for the smoothed indicator.
//!
//! The visual ring fills 0→1 during work and empties 1→0 during a break.
//! The sampler eases the displayed value toward the target each frame so
//! the coarse countdown tick never shows as stepping.

use crate::timer::engine::Phase;

pub const SMOOTHING_FACTOR: f32 = 0.1;

/// Target progress for a phase given its full duration and the time left.
pub fn target_progress(phase: Phase, duration_secs: f64, remaining_secs: f64) -> f32 {
    if duration_secs <= 0.0 {
        return baseline(phase);
    }
    let elapsed_fraction = ((duration_secs - remaining_secs) / duration_secs).clamp(0.0, 1.0) as f32;
    match phase {
        Phase::Work => elapsed_fraction,
        Phase::Break => 1.0 - elapsed_fraction,
    }
}

/// Where the indicator starts when a phase begins.
pub fn baseline(phase: Phase) -> f32 {
    match phase {
        Phase::Work => 0.0,
        Phase::Break => 1.0,
    }
}

/// One easing step toward the target.
pub fn ease(displayed: f32, target: f32) -> f32 {
    (displayed + (target - displayed) * SMOOTHING_FACTOR).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_progress_rises_with_elapsed_time() {
        assert_eq!(target_progress(Phase::Work, 1500.0, 1500.0), 0.0);
        assert!((target_progress(Phase::Work, 1500.0, 750.0) - 0.5).abs() < 1e-6);
        assert_eq!(target_progress(Phase::Work, 1500.0, 0.0), 1.0);
    }

    #[test]
    fn break_progress_falls_with_elapsed_time() {
        assert_eq!(target_progress(Phase::Break, 300.0, 300.0), 1.0);
        assert!((target_progress(Phase::Break, 300.0, 150.0) - 0.5).abs() < 1e-6);
        assert_eq!(target_progress(Phase::Break, 300.0, 0.0), 0.0);
    }

    #[test]
    fn ease_approaches_target_monotonically() {
        let mut displayed = 0.0f32;
        let target = 1.0f32;
        for _ in 0..200 {
            let next = ease(displayed, target);
            assert!(next >= displayed);
            assert!(next <= target);
            displayed = next;
        }
        assert!((target - displayed) < 1e-6);
    }

    #[test]
    fn ease_stays_in_bounds() {
        assert!(ease(0.99, 2.0) <= 1.0);
        assert!(ease(0.01, -1.0) >= 0.0);
    }
}
