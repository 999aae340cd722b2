//! Splitting long pen-up moves into bounded pieces.
//!
//! A single huge cord-length delta risks exceeding what the mechanism can
//! do in one command, so repositioning moves are cut into equal pieces of
//! at most `max_segment` wall millimeters before they're converted to cord
//! space.

use crate::WallPoint;

/// Moves shorter than this are treated as no-ops.
pub const TRAVEL_EPSILON: f64 = 1e-9;

/// The intermediate points of a straight wall-space move, excluding the
/// start and including the end.
#[derive(Clone, Debug)]
pub struct TravelSegments {
    start: WallPoint,
    end: WallPoint,
    idx: usize,
    count: usize,
}

/// Splits the move from `start` to `end` into `ceil(distance / max_segment)`
/// equal pieces.
///
/// A move of (almost) zero length yields no points at all. A non-positive
/// `max_segment` disables splitting, and the move is a single piece.
pub fn segment_travel(start: WallPoint, end: WallPoint, max_segment: f64) -> TravelSegments {
    let dist = libm::hypot(end.x - start.x, end.y - start.y);
    let count = if dist <= TRAVEL_EPSILON {
        0
    } else if max_segment <= 0.0 {
        1
    } else {
        (libm::ceil(dist / max_segment) as usize).max(1)
    };
    TravelSegments {
        start,
        end,
        idx: 0,
        count,
    }
}

impl Iterator for TravelSegments {
    type Item = WallPoint;

    fn next(&mut self) -> Option<WallPoint> {
        if self.idx >= self.count {
            return None;
        }
        self.idx += 1;
        if self.idx == self.count {
            // Land exactly on the end, without any rounding from the lerp.
            return Some(self.end);
        }
        let t = self.idx as f64 / self.count as f64;
        Some(self.start.lerp(self.end, t))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.idx;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TravelSegments {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn twelve_by_five() {
        let pts: Vec<_> =
            segment_travel(WallPoint::new(0.0, 0.0), WallPoint::new(12.0, 0.0), 5.0).collect();
        assert_eq!(pts.len(), 3);
        for (p, x) in pts.iter().zip([4.0, 8.0, 12.0]) {
            assert!((p.x - x).abs() < 1e-12);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn no_op_move() {
        let p = WallPoint::new(3.0, 4.0);
        assert_eq!(segment_travel(p, p, 5.0).count(), 0);
        assert_eq!(segment_travel(p, p, 0.0).count(), 0);
    }

    #[test]
    fn non_positive_max_segment() {
        let start = WallPoint::new(0.0, 0.0);
        let end = WallPoint::new(300.0, 400.0);
        for max in [0.0, -5.0] {
            let pts: Vec<_> = segment_travel(start, end, max).collect();
            assert_eq!(pts, vec![end]);
        }
    }

    #[test]
    fn short_move_is_one_piece() {
        let pts: Vec<_> =
            segment_travel(WallPoint::new(1.0, 1.0), WallPoint::new(2.0, 1.0), 5.0).collect();
        assert_eq!(pts, vec![WallPoint::new(2.0, 1.0)]);
    }

    proptest! {
        #[test]
        fn count_law(
            x0 in -1000.0..1000.0f64,
            y0 in -1000.0..1000.0f64,
            x1 in -1000.0..1000.0f64,
            y1 in -1000.0..1000.0f64,
            max in 0.1..100.0f64,
        ) {
            let start = WallPoint::new(x0, y0);
            let end = WallPoint::new(x1, y1);
            let dist = (x1 - x0).hypot(y1 - y0);
            let pts: Vec<_> = segment_travel(start, end, max).collect();
            if dist <= TRAVEL_EPSILON {
                prop_assert!(pts.is_empty());
            } else {
                let expected = ((dist / max).ceil() as usize).max(1);
                prop_assert_eq!(pts.len(), expected);
                prop_assert_eq!(*pts.last().unwrap(), end);

                // No piece is longer than the limit (up to rounding).
                let mut prev = start;
                for p in &pts {
                    prop_assert!((p.x - prev.x).hypot(p.y - prev.y) <= max + 1e-9);
                    prev = *p;
                }
            }
        }
    }
}
