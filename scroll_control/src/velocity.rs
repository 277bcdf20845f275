//! Position → scroll velocity mapping.

use crate::sample::{PositionSample, Sensitivity};

/// Positions strictly above this line (smaller numbers) scroll up.
pub const ZONE_TOP: f32 = 35.0;
/// Positions strictly below this line (larger numbers) scroll down.
pub const ZONE_BOTTOM: f32 = 65.0;

// ════════════════════════════════════════════════════════════════════════════
// Zone
// ════════════════════════════════════════════════════════════════════════════

/// Which band of the frame a position falls in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    Up,
    /// `[35, 65]`, boundaries included.
    Neutral,
    Down,
}

impl Zone {
    pub fn of(position: f32) -> Zone {
        if position < ZONE_TOP {
            Zone::Up
        } else if position > ZONE_BOTTOM {
            Zone::Down
        } else {
            Zone::Neutral
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// compute_velocity
// ════════════════════════════════════════════════════════════════════════════

/// Map a hand position to a signed scroll velocity.
///
/// Ramps linearly from 0 at the zone boundary to `±sensitivity` at the frame
/// edge.  Stateless: equal inputs always give equal outputs.
pub fn compute_velocity(position: f32, hand_present: bool, sensitivity: f32) -> f32 {
    if !hand_present {
        return 0.0;
    }
    match Zone::of(position) {
        Zone::Up => {
            let intensity = (ZONE_TOP - position) / ZONE_TOP;
            -intensity * sensitivity
        }
        Zone::Down => {
            let intensity = (position - ZONE_BOTTOM) / (100.0 - ZONE_BOTTOM);
            intensity * sensitivity
        }
        Zone::Neutral => 0.0,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScrollController — owner of the shared control state
// ════════════════════════════════════════════════════════════════════════════

/// Holds the latest sample and sensitivity together with the velocity derived
/// from them.  Every mutation recomputes the velocity on the spot.
#[derive(Clone, Debug)]
pub struct ScrollController {
    sample:      PositionSample,
    sensitivity: Sensitivity,
    velocity:    f32,
}

impl ScrollController {
    pub fn new(sensitivity: Sensitivity) -> Self {
        let mut ctl = ScrollController {
            sample: PositionSample::absent(),
            sensitivity,
            velocity: 0.0,
        };
        ctl.recompute();
        ctl
    }

    pub fn observe(&mut self, sample: PositionSample) {
        self.sample = sample;
        self.recompute();
    }

    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.sensitivity = sensitivity;
        self.recompute();
    }

    /// Nudge sensitivity by `delta`, returning the new value.
    pub fn adjust_sensitivity(&mut self, delta: i32) -> Sensitivity {
        self.set_sensitivity(self.sensitivity.step(delta));
        self.sensitivity
    }

    pub fn sample(&self)      -> PositionSample { self.sample }
    pub fn sensitivity(&self) -> Sensitivity    { self.sensitivity }
    pub fn velocity(&self)    -> f32            { self.velocity }

    /// `None` while no hand is present.
    pub fn zone(&self) -> Option<Zone> {
        self.sample.hand_present.then(|| Zone::of(self.sample.vertical_position))
    }

    fn recompute(&mut self) {
        self.velocity = compute_velocity(
            self.sample.vertical_position,
            self.sample.hand_present,
            self.sensitivity.as_f32(),
        );
    }
}

impl Default for ScrollController {
    fn default() -> Self { ScrollController::new(Sensitivity::default()) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn sensitivities() -> impl Iterator<Item = f32> {
        (Sensitivity::MIN..=Sensitivity::MAX).map(f32::from)
    }

    // ── zones ────────────────────────────────────────────────────────────
    #[test]
    fn upper_band_scrolls_up_and_fades_toward_boundary() {
        for s in sensitivities() {
            let mut prev = f32::INFINITY;
            for tenth in 0..350 {
                let p = tenth as f32 / 10.0;
                let v = compute_velocity(p, true, s);
                assert!(v < 0.0, "p={} s={} v={}", p, s, v);
                assert!(v.abs() <= prev, "magnitude grew at p={}", p);
                prev = v.abs();
            }
        }
    }

    #[test]
    fn lower_band_scrolls_down_and_grows_toward_edge() {
        for s in sensitivities() {
            let mut prev = 0.0;
            for tenth in 651..=1000 {
                let p = tenth as f32 / 10.0;
                let v = compute_velocity(p, true, s);
                assert!(v > 0.0, "p={} s={} v={}", p, s, v);
                assert!(v >= prev, "magnitude shrank at p={}", p);
                prev = v;
            }
        }
    }

    #[test]
    fn neutral_band_holds() {
        for s in sensitivities() {
            for tenth in 350..=650 {
                let p = tenth as f32 / 10.0;
                assert_eq!(compute_velocity(p, true, s), 0.0, "p={}", p);
            }
        }
    }

    #[test]
    fn no_hand_never_scrolls() {
        for s in sensitivities() {
            for p in [0.0, 10.0, 35.0, 50.0, 65.0, 90.0, 100.0] {
                assert_eq!(compute_velocity(p, false, s), 0.0);
            }
        }
    }

    #[test]
    fn boundaries_are_exact() {
        for s in sensitivities() {
            assert_eq!(compute_velocity(0.0, true, s), -s);
            assert_eq!(compute_velocity(100.0, true, s), s);
            assert_eq!(compute_velocity(ZONE_TOP, true, s), 0.0);
            assert_eq!(compute_velocity(ZONE_BOTTOM, true, s), 0.0);
        }
    }

    #[test]
    fn repeated_calls_agree() {
        let a = compute_velocity(12.3, true, 17.0);
        for _ in 0..10 {
            assert_eq!(compute_velocity(12.3, true, 17.0), a);
        }
    }

    #[test]
    fn zone_of_boundaries() {
        assert_eq!(Zone::of(34.9), Zone::Up);
        assert_eq!(Zone::of(35.0), Zone::Neutral);
        assert_eq!(Zone::of(65.0), Zone::Neutral);
        assert_eq!(Zone::of(65.1), Zone::Down);
    }

    // ── ScrollController ─────────────────────────────────────────────────
    #[test]
    fn controller_starts_still() {
        let ctl = ScrollController::default();
        assert_eq!(ctl.velocity(), 0.0);
        assert_eq!(ctl.zone(), None);
    }

    #[test]
    fn controller_recomputes_on_sample() {
        let mut ctl = ScrollController::new(Sensitivity::new(20));
        ctl.observe(PositionSample::new(true, 100.0));
        assert_eq!(ctl.velocity(), 20.0);
        assert_eq!(ctl.zone(), Some(Zone::Down));
        ctl.observe(PositionSample::new(false, 100.0));
        assert_eq!(ctl.velocity(), 0.0);
    }

    #[test]
    fn controller_recomputes_on_sensitivity_change() {
        let mut ctl = ScrollController::new(Sensitivity::new(10));
        ctl.observe(PositionSample::new(true, 0.0));
        assert_eq!(ctl.velocity(), -10.0);
        ctl.set_sensitivity(Sensitivity::new(25));
        assert_eq!(ctl.velocity(), -25.0);
        let s = ctl.adjust_sensitivity(10);
        assert_eq!(s.get(), 30);
        assert_eq!(ctl.velocity(), -30.0);
    }
}
