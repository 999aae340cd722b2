//! The pen carousel.
//!
//! The carousel binds (or skips steps) if an automated sequence drives it
//! backwards through zero, so every automated pen change is a forward
//! (counter-clockwise, increasing-angle) rotation, even if that costs an
//! extra near-full turn.

use scribit_protocol::PenSlot;

/// The carousel angle, in degrees, right after homing against the hall sensor.
pub const HOME_ANGLE: f64 = -56.0;

/// The commanded angle of the carousel, in degrees.
///
/// The angle is unknown until the carousel is homed. After that it never
/// decreases as a result of [`Carousel::select_target`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Carousel {
    current: Option<f64>,
}

impl Carousel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }

    /// Record that the carousel has been homed.
    pub fn home(&mut self) -> f64 {
        self.current = Some(HOME_ANGLE);
        HOME_ANGLE
    }

    /// The absolute angle to command in order to present `slot`, moving
    /// counter-clockwise only.
    ///
    /// If the carousel was never homed, this is just the slot's angle: the
    /// firmware will take whatever route it likes. We still remember the
    /// target, since that's where the firmware thinks the carousel is.
    pub fn select_target(&mut self, slot: PenSlot) -> f64 {
        let base = slot.angle();
        let target = match self.current {
            None => {
                log::warn!("selecting pen {slot} before homing the carousel");
                base
            }
            Some(current) => ccw_target(current, base),
        };
        self.current = Some(target);
        target
    }

    /// Track a manual carousel jog. This doesn't enforce the
    /// counter-clockwise rule: manual jogs are supervised by a human.
    pub fn apply_relative_jog(&mut self, delta: f64) -> Option<f64> {
        if let Some(current) = &mut self.current {
            *current += delta;
        }
        self.current
    }
}

/// The smallest `base + 360 * k` (with `k >= 0`) that is at least `current`.
fn ccw_target(current: f64, base: f64) -> f64 {
    if base >= current {
        return base;
    }
    let turns = ((current - base) / 360.0).ceil();
    let mut target = base + 360.0 * turns;
    // Guard against the division rounding down.
    while target < current {
        target += 360.0;
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn slot(n: u8) -> PenSlot {
        PenSlot::new(n).unwrap()
    }

    #[test]
    fn first_pen_after_home() {
        let mut c = Carousel::new();
        assert_eq!(c.home(), -56.0);
        assert_eq!(c.select_target(slot(1)), 89.0);
        assert_eq!(c.current(), Some(89.0));
    }

    #[test]
    fn wraps_forward() {
        let mut c = Carousel { current: Some(120.0) };
        assert_eq!(c.select_target(slot(1)), 449.0);
        assert_eq!(c.current(), Some(449.0));
    }

    #[test]
    fn reselecting_stays_put() {
        let mut c = Carousel::new();
        c.home();
        let first = c.select_target(slot(3));
        assert_eq!(c.select_target(slot(3)), first);
    }

    #[test]
    fn cycling_through_pens() {
        let mut c = Carousel::new();
        c.home();
        let targets: Vec<f64> = [1, 2, 3, 4, 1, 4, 2]
            .into_iter()
            .map(|n| c.select_target(slot(n)))
            .collect();
        assert_eq!(targets, [89.0, 161.0, 233.0, 305.0, 449.0, 665.0, 881.0]);
    }

    #[test]
    fn unhomed_is_best_effort() {
        let mut c = Carousel::new();
        assert_eq!(c.select_target(slot(4)), 305.0);
        // We remember where we sent it.
        assert_eq!(c.select_target(slot(1)), 449.0);
    }

    #[test]
    fn manual_jog() {
        let mut c = Carousel::new();
        assert_eq!(c.apply_relative_jog(30.0), None);
        c.home();
        assert_eq!(c.apply_relative_jog(30.0), Some(-26.0));
        // Manual jogs may go backwards.
        assert_eq!(c.apply_relative_jog(-100.0), Some(-126.0));
        assert_eq!(c.select_target(slot(1)), 89.0);
    }

    #[test]
    fn home_resets() {
        let mut c = Carousel::new();
        c.home();
        c.select_target(slot(4));
        c.select_target(slot(2));
        c.home();
        assert_eq!(c.current(), Some(HOME_ANGLE));
        assert_eq!(c.select_target(slot(2)), 161.0);
    }

    proptest! {
        #[test]
        fn never_reverses(
            start in -1000.0..1000.0f64,
            slots in proptest::collection::vec(1u8..=4, 1..50),
        ) {
            let mut c = Carousel { current: Some(start) };
            for n in slots {
                let before = c.current().unwrap();
                let target = c.select_target(slot(n));
                prop_assert!(target >= before);
                // Same physical slot.
                let turns = (target - slot(n).angle()) / 360.0;
                prop_assert!((turns - turns.round()).abs() < 1e-9);
                prop_assert!(turns.round() >= 0.0);
                // And no more than one turn of overshoot.
                if before > slot(n).angle() - 360.0 {
                    prop_assert!(target - before < 360.0 + 1e-9);
                }
                prop_assert_eq!(c.current(), Some(target));
            }
        }
    }
}
