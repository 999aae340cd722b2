//! Turning curves into dense polylines.
//!
//! We sample uniformly in the curve parameter, choosing the number of
//! samples from the curve's length on the wall. This isn't uniform in
//! arclength for curvy paths, but with small steps it doesn't matter much.

use kurbo::{
    BezPath, CubicBez, Line, ParamCurve, ParamCurveArclen, ParamCurveExtrema, PathEl, PathSeg,
    Point, QuadBez, Rect,
};

/// Accuracy used when measuring curve lengths, in curve units.
pub const ARCLEN_ACCURACY: f64 = 1e-3;

/// A curve parametrized by `t` in `[0, 1]`.
pub trait Curve {
    fn eval(&self, t: f64) -> Point;
    fn arclen(&self, accuracy: f64) -> f64;

    /// Exactly the point at `t = 0`.
    fn start(&self) -> Point;
    /// Exactly the point at `t = 1`, which `eval(1.0)` might miss by rounding.
    fn end(&self) -> Point;
}

impl<C: ParamCurve + ParamCurveArclen> Curve for C {
    fn eval(&self, t: f64) -> Point {
        ParamCurve::eval(self, t)
    }

    fn start(&self) -> Point {
        ParamCurve::start(self)
    }

    fn end(&self) -> Point {
        ParamCurve::end(self)
    }

    fn arclen(&self, accuracy: f64) -> f64 {
        ParamCurveArclen::arclen(self, accuracy)
    }
}

/// A connected sequence of Bézier segments, drawn without lifting the pen.
///
/// The parameter range is split evenly between the segments: segment `i` of
/// `n` covers `[i / n, (i + 1) / n]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    segments: Vec<PathSeg>,
}

impl Stroke {
    /// Returns `None` if there are no segments.
    pub fn new(segments: Vec<PathSeg>) -> Option<Self> {
        (!segments.is_empty()).then_some(Stroke { segments })
    }

    /// Splits a path into its subpaths. Subpaths without any drawing
    /// segments are dropped.
    pub fn from_bez_path(path: &BezPath) -> Vec<Stroke> {
        let mut ret = Vec::new();
        let mut segments = Vec::new();
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;

        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    ret.extend(Stroke::new(std::mem::take(&mut segments)));
                    start = p;
                    last = p;
                }
                PathEl::LineTo(p) => {
                    segments.push(PathSeg::Line(Line::new(last, p)));
                    last = p;
                }
                PathEl::QuadTo(p, q) => {
                    segments.push(PathSeg::Quad(QuadBez::new(last, p, q)));
                    last = q;
                }
                PathEl::CurveTo(p, q, r) => {
                    segments.push(PathSeg::Cubic(CubicBez::new(last, p, q, r)));
                    last = r;
                }
                PathEl::ClosePath => {
                    if last != start {
                        segments.push(PathSeg::Line(Line::new(last, start)));
                    }
                    last = start;
                }
            }
        }
        ret.extend(Stroke::new(segments));
        ret
    }

    pub fn segments(&self) -> &[PathSeg] {
        &self.segments
    }

    pub fn bounding_box(&self) -> Rect {
        self.segments
            .iter()
            .map(|seg| seg.bounding_box())
            .reduce(|a, b| a.union(b))
            .unwrap_or_default()
    }
}

fn seg_start(seg: &PathSeg) -> Point {
    match seg {
        PathSeg::Line(l) => l.p0,
        PathSeg::Quad(q) => q.p0,
        PathSeg::Cubic(c) => c.p0,
    }
}

fn seg_end(seg: &PathSeg) -> Point {
    match seg {
        PathSeg::Line(l) => l.p1,
        PathSeg::Quad(q) => q.p2,
        PathSeg::Cubic(c) => c.p3,
    }
}

impl Curve for Stroke {
    fn eval(&self, t: f64) -> Point {
        let n = self.segments.len();
        let scaled = t.clamp(0.0, 1.0) * n as f64;
        let idx = (scaled.floor() as usize).min(n - 1);
        ParamCurve::eval(&self.segments[idx], scaled - idx as f64)
    }

    fn arclen(&self, accuracy: f64) -> f64 {
        self.segments
            .iter()
            .map(|seg| ParamCurveArclen::arclen(seg, accuracy))
            .sum()
    }

    fn start(&self) -> Point {
        self.segments.first().map(seg_start).unwrap_or_default()
    }

    fn end(&self) -> Point {
        self.segments.last().map(seg_end).unwrap_or_default()
    }
}

/// How many pieces to cut a curve of wall length `length_wall` into.
pub fn sample_count(length_wall: f64, step_mm: f64) -> usize {
    ((length_wall / step_mm.max(1e-9)).ceil() as usize).max(1)
}

/// Samples `curve` at `n + 1` evenly spaced parameters (both endpoints
/// included, exactly), where `n` is chosen so that consecutive samples are roughly
/// `step_mm` apart on the wall. `scale` converts curve units to wall
/// millimeters.
///
/// The returned points are still in curve coordinates.
pub fn sample_uniform<C: Curve + ?Sized>(curve: &C, step_mm: f64, scale: f64) -> Vec<Point> {
    let length_wall = curve.arclen(ARCLEN_ACCURACY) * scale;
    let n = sample_count(length_wall, step_mm);
    let mut ret = Vec::with_capacity(n + 1);
    ret.push(curve.start());
    ret.extend((1..n).map(|i| curve.eval(i as f64 / n as f64)));
    ret.push(curve.end());
    ret
}

#[cfg(test)]
mod tests {
    use kurbo::{Circle, Shape as _};
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn line_samples() {
        let line = Line::new((0.0, 0.0), (10.0, 0.0));
        let pts = sample_uniform(&line, 1.0, 2.0);
        // 20mm on the wall, at 1mm a step.
        assert_eq!(pts.len(), 21);
        assert_eq!(pts[0], Point::new(0.0, 0.0));
        assert_eq!(pts[20], Point::new(10.0, 0.0));
        assert!((pts[1].x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn degenerate_curve() {
        let dot = Line::new((3.0, 4.0), (3.0, 4.0));
        let pts = sample_uniform(&dot, 1.0, 1.0);
        assert_eq!(pts, vec![Point::new(3.0, 4.0); 2]);
    }

    #[test]
    fn subpaths() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.line_to((10.0, 10.0));
        path.close_path();
        path.move_to((50.0, 50.0));
        path.move_to((20.0, 20.0));
        path.quad_to((25.0, 30.0), (30.0, 20.0));

        let strokes = Stroke::from_bez_path(&path);
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].segments().len(), 3);
        assert_eq!(
            strokes[0].segments()[2],
            PathSeg::Line(Line::new((10.0, 10.0), (0.0, 0.0)))
        );
        assert_eq!(strokes[1].segments().len(), 1);
        assert_eq!(strokes[1].bounding_box().min_x(), 20.0);
        assert_eq!(strokes[1].bounding_box().max_x(), 30.0);
    }

    #[test]
    fn stroke_parametrization() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.line_to((10.0, 30.0));
        let stroke = &Stroke::from_bez_path(&path)[0];

        assert_eq!(Curve::eval(stroke, 0.0), Point::new(0.0, 0.0));
        assert_eq!(Curve::eval(stroke, 0.5), Point::new(10.0, 0.0));
        assert_eq!(Curve::eval(stroke, 0.75), Point::new(10.0, 15.0));
        assert_eq!(Curve::eval(stroke, 1.0), Point::new(10.0, 30.0));
        assert!((Curve::arclen(stroke, 1e-6) - 40.0).abs() < 1e-9);
        assert_eq!(Curve::start(stroke), Point::new(0.0, 0.0));
        assert_eq!(Curve::end(stroke), Point::new(10.0, 30.0));

        let pts = sample_uniform(stroke, 4.0, 1.0);
        assert_eq!(pts.len(), 11);
    }

    #[test]
    fn circle_length() {
        let circle: BezPath = Circle::new((0.0, 0.0), 10.0).path_elements(1e-3).collect();
        let stroke = &Stroke::from_bez_path(&circle)[0];
        let expected = 2.0 * std::f64::consts::PI * 10.0;
        assert!((Curve::arclen(stroke, 1e-6) - expected).abs() < 1e-2);
    }

    #[test]
    fn endpoints_are_exact() {
        // eval(1.0) lands one ulp short of this end point.
        let line = Line::new((-97.13, 0.0), (20.085959661042256, 0.0));
        let pts = sample_uniform(&line, 0.1, 0.1);
        assert_eq!(pts[0], line.p0);
        assert_eq!(*pts.last().unwrap(), line.p1);

        let mut path = BezPath::new();
        path.move_to((-97.13, 0.0));
        path.quad_to((0.0, 3.0), (20.085959661042256, 0.0));
        let stroke = &Stroke::from_bez_path(&path)[0];
        let pts = sample_uniform(stroke, 0.1, 0.1);
        assert_eq!(*pts.last().unwrap(), Point::new(20.085959661042256, 0.0));
    }

    proptest! {
        #[test]
        fn count_law(
            x0 in -100.0..100.0f64,
            y0 in -100.0..100.0f64,
            x1 in -100.0..100.0f64,
            y1 in -100.0..100.0f64,
            step in 0.1..20.0f64,
            scale in 0.1..10.0f64,
        ) {
            let line = Line::new((x0, y0), (x1, y1));
            let pts = sample_uniform(&line, step, scale);
            let length_wall = (x1 - x0).hypot(y1 - y0) * scale;
            let n = ((length_wall / step).ceil() as usize).max(1);
            prop_assert_eq!(pts.len(), n + 1);
            prop_assert_eq!(pts[0], line.p0);
            prop_assert_eq!(*pts.last().unwrap(), line.p1);
        }
    }
}
