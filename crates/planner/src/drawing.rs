//! Converting a whole drawing into a pair of motion programs.
//!
//! The first program ("bbox dots") puts a dot at each corner of the
//! drawing's bounding box, so that the placement can be checked before
//! committing to the full drawing. The second program draws everything.
//! Both start with the head at the wall center.

use kurbo::{Affine, Point, Rect};
use scribit_geom::{Config, FromKurbo as _, WallPoint};
use scribit_protocol::{MotionProgram, PenAction, PenSlot};

use crate::{
    sampler::{sample_uniform, Stroke},
    Carousel, Error, ProgramBuilder, Result,
};

/// The largest allowed fit fraction. Slightly more than 1 is allowed for
/// experimenting with drawings that spill past the anchors.
pub const MAX_FIT_FRAC: f64 = 1.5;

#[derive(Clone, Debug)]
pub struct DrawingConfig {
    pub geom: Config,
    /// The fraction of the anchor distance that the drawing's larger side
    /// should span.
    pub fit_frac: f64,
    /// Target spacing of drawn points, in wall millimeters.
    pub step_mm: f64,
    /// Longest allowed pen-up move, in wall millimeters.
    pub travel_step_mm: f64,
    pub travel_feed: u32,
    pub draw_feed: u32,
    pub carousel_feed: u32,
    pub dot_dwell_s: f64,
    pub bbox_pen: PenSlot,
    /// The pen for colors that didn't get one of their own.
    pub default_pen: PenSlot,
    pub home_carousel: bool,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        DrawingConfig {
            geom: Config::default(),
            fit_frac: 0.70,
            step_mm: 1.0,
            travel_step_mm: 5.0,
            travel_feed: 600,
            draw_feed: 300,
            carousel_feed: 600,
            dot_dwell_s: 0.20,
            bbox_pen: PenSlot::ALL[0],
            default_pen: PenSlot::ALL[0],
            home_carousel: true,
        }
    }
}

impl DrawingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.fit_frac > 0.0 && self.fit_frac <= MAX_FIT_FRAC) {
            return Err(Error::InvalidConfiguration(format!(
                "fit fraction must be in (0, {MAX_FIT_FRAC}], got {}",
                self.fit_frac
            )));
        }
        Ok(())
    }
}

/// A stroke, and the pen to draw it with.
#[derive(Clone, Debug, PartialEq)]
pub struct PenStroke {
    pub stroke: Stroke,
    pub pen: PenSlot,
}

/// Places a drawing on the wall: the drawing's bounding box is centered on
/// the wall center and uniformly scaled so that its larger side spans
/// `fit_frac` of the anchor distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitTransform {
    bbox: Rect,
    scale: f64,
    affine: Affine,
}

impl FitTransform {
    pub fn new(bbox: Rect, geom: &Config, fit_frac: f64) -> Result<Self> {
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(Error::DegenerateInput(
                "the drawing's bounding box has zero width or height",
            ));
        }
        let target = fit_frac * geom.anchor_distance().get();
        let scale = (target / bbox.width()).min(target / bbox.height());
        let center = geom.wall_center();
        let affine = Affine::translate(-bbox.center().to_vec2())
            .then_scale(scale)
            .then_translate((center.x, center.y).into());
        Ok(FitTransform {
            bbox,
            scale,
            affine,
        })
    }

    /// Wall millimeters per drawing unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn map(&self, p: Point) -> WallPoint {
        WallPoint::from_kurbo(self.affine * p)
    }

    /// The corners of the bounding box on the wall, in the order top-left,
    /// top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [WallPoint; 4] {
        let b = self.bbox;
        [
            Point::new(b.x0, b.y0),
            Point::new(b.x1, b.y0),
            Point::new(b.x1, b.y1),
            Point::new(b.x0, b.y1),
        ]
        .map(|p| self.map(p))
    }
}

#[derive(Clone, Debug)]
pub struct Programs {
    pub bbox_dots: MotionProgram,
    pub drawing: MotionProgram,
    pub transform: FitTransform,
}

pub fn convert(strokes: &[PenStroke], config: &DrawingConfig) -> Result<Programs> {
    config.validate()?;
    let bbox = strokes
        .iter()
        .map(|s| s.stroke.bounding_box())
        .reduce(|a, b| a.union(b))
        .ok_or(Error::DegenerateInput("there are no strokes"))?;
    let transform = FitTransform::new(bbox, &config.geom, config.fit_frac)?;

    log::info!(
        "anchor distance {:.1}mm, scale {:.6}, fit fraction {}, step {}mm, travel step {}mm",
        config.geom.anchor_distance().get(),
        transform.scale(),
        config.fit_frac,
        config.step_mm,
        config.travel_step_mm,
    );

    let bbox_dots = bbox_dots(&transform, config);
    let drawing = drawing(strokes, &transform, config);
    log::info!(
        "{} lines of calibration, {} lines of drawing",
        bbox_dots.len(),
        drawing.len()
    );

    Ok(Programs {
        bbox_dots,
        drawing,
        transform,
    })
}

fn start(config: &DrawingConfig, carousel: &mut Carousel) -> ProgramBuilder {
    let mut prog = ProgramBuilder::new();
    if config.home_carousel {
        prog.home(carousel);
    }
    prog
}

fn bbox_dots(transform: &FitTransform, config: &DrawingConfig) -> MotionProgram {
    let geom = &config.geom;
    let pen = config.bbox_pen;
    let mut carousel = Carousel::new();
    let mut prog = start(config, &mut carousel);
    let mut pos = geom.wall_center();

    prog.select_pen(&mut carousel, pen, PenAction::Up, config.carousel_feed);
    for corner in transform.corners() {
        pos = prog.travel(geom, pos, corner, config.travel_step_mm, config.travel_feed);
        prog.latch_pen()
            .dwell(config.dot_dwell_s)
            .select_pen(&mut carousel, pen, PenAction::Up, config.carousel_feed);
    }
    prog.build()
}

fn drawing(
    strokes: &[PenStroke],
    transform: &FitTransform,
    config: &DrawingConfig,
) -> MotionProgram {
    let geom = &config.geom;
    let mut carousel = Carousel::new();
    let mut prog = start(config, &mut carousel);
    let mut pos = geom.wall_center();

    for PenStroke { stroke, pen } in strokes {
        let points: Vec<WallPoint> = sample_uniform(stroke, config.step_mm, transform.scale())
            .into_iter()
            .map(|p| transform.map(p))
            .collect();
        // The sampler always returns at least two points.
        let Some((first, rest)) = points.split_first() else {
            continue;
        };

        prog.select_pen(&mut carousel, *pen, PenAction::Up, config.carousel_feed);
        pos = prog.travel(geom, pos, *first, config.travel_step_mm, config.travel_feed);
        prog.latch_pen();
        for p in rest {
            prog.cord_move(geom, &pos, p, config.draw_feed);
            pos = *p;
        }
        prog.select_pen(&mut carousel, *pen, PenAction::Up, config.carousel_feed);
    }
    prog.build()
}
