//! Replays a motion program on paper (well, in an SVG), so that a drawing
//! can be checked without going near the wall.

use std::path::Path;

use scribit_geom::{Config, Len, WallPoint};
use scribit_protocol::{GCode, MotionProgram, PenSlot};
use svg::{
    node::element::{path::Data, Circle, Path as SvgPath},
    Document,
};

const TRAVEL_COLOR: &str = "#cccccc";
const PEN_COLORS: [&str; 4] = ["#d62728", "#1f77b4", "#2ca02c", "#9467bd"];

/// A straight move (in cord space) of the head.
#[derive(Clone, Debug, PartialEq)]
pub struct Move {
    pub from: WallPoint,
    pub to: WallPoint,
    /// The pen that was down during this move, if any.
    pub pen: Option<PenSlot>,
}

/// The pen whose slot angle matches `angle`, modulo full turns.
fn slot_at(angle: f64) -> Option<PenSlot> {
    PenSlot::ALL.into_iter().find(|slot| {
        let turns = (angle - slot.angle()) / 360.0;
        (turns - turns.round()).abs() < 1e-6
    })
}

/// Runs `program` starting with the head at the wall center.
///
/// A pen pulse puts down the pen facing the wall; any carousel motion
/// lifts it again.
pub fn replay(program: &MotionProgram, geom: &Config) -> Vec<Move> {
    let mut lengths = geom.point_to_cord_lengths(&geom.wall_center());
    let mut pos = geom.wall_center();
    let mut absolute = false;
    let mut angle: Option<f64> = None;
    let mut pen_down = false;
    let mut ret = Vec::new();

    for line in program.lines() {
        match *line {
            GCode::Absolute => absolute = true,
            GCode::Incremental => absolute = false,
            GCode::CordMove { x, y, .. } => {
                if absolute {
                    log::warn!("ignoring absolute cord move {line}");
                    continue;
                }
                lengths.left += Len::new(x);
                lengths.right -= Len::new(y);
                let to = geom.cord_lengths_to_point(&lengths);
                ret.push(Move {
                    from: pos,
                    to,
                    pen: angle.filter(|_| pen_down).and_then(slot_at),
                });
                pos = to;
            }
            GCode::CarouselMove { z, .. } => {
                angle = if absolute {
                    Some(z)
                } else {
                    angle.map(|a| a + z)
                };
                pen_down = false;
            }
            GCode::HomeCarousel => {
                angle = None;
                pen_down = false;
            }
            GCode::SetCarouselAngle { z } => angle = Some(z),
            GCode::PenPulse => pen_down = true,
            GCode::Millimeters | GCode::EnableMotors | GCode::Dwell { .. } => {}
        }
    }
    ret
}

pub fn render(moves: &[Move], geom: &Config) -> Document {
    let d = geom.anchor_distance().get();
    let mut document = Document::new()
        .set("viewBox", (0.0, 0.0, d, d))
        .set("width", format!("{}mm", d))
        .set("height", format!("{}mm", d));

    // The anchors.
    for x in [0.0, d] {
        document = document.add(
            Circle::new()
                .set("cx", x)
                .set("cy", 0.0)
                .set("r", 8.0)
                .set("fill", "black"),
        );
    }

    // Consecutive moves with the same pen go into one path.
    let mut chunks: Vec<(Option<PenSlot>, Data)> = Vec::new();
    for mv in moves {
        match chunks.last_mut() {
            Some((pen, data)) if *pen == mv.pen => {
                *data = data.clone().line_to((mv.to.x, mv.to.y));
            }
            _ => chunks.push((
                mv.pen,
                Data::new()
                    .move_to((mv.from.x, mv.from.y))
                    .line_to((mv.to.x, mv.to.y)),
            )),
        }
    }

    for (pen, data) in chunks {
        let (color, width) = match pen {
            Some(slot) => (PEN_COLORS[slot.number() as usize - 1], 2.0),
            None => (TRAVEL_COLOR, 1.0),
        };
        document = document.add(
            SvgPath::new()
                .set("fill", "none")
                .set("stroke", color)
                .set("stroke-width", width)
                .set("d", data),
        );
    }
    document
}

pub fn write_preview(out: &Path, program: &MotionProgram, geom: &Config) -> anyhow::Result<()> {
    let moves = replay(program, geom);
    let drawn = moves.iter().filter(|m| m.pen.is_some()).count();
    log::info!("preview: {} moves, {drawn} with the pen down", moves.len());
    svg::save(out, &render(&moves, geom))?;
    Ok(())
}
