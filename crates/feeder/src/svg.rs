use std::path::Path;

use kurbo::BezPath;
use scribit_planner::{PenStroke, Stroke};
use scribit_protocol::PenSlot;
use usvg::{roxmltree, tiny_skia_path::PathSegment, NodeExt, Paint, TreeParsing};

/// The elements that usvg turns into paths.
const SHAPES: [&str; 7] = ["path", "rect", "circle", "ellipse", "line", "polyline", "polygon"];

const BLACK_STROKE: &str = r##" fill="none" stroke="#000000""##;

/// Assigns pens to colors, in the order the colors are first seen.
#[derive(Debug)]
pub struct PenMap {
    colors: Vec<(String, PenSlot)>,
    default_pen: PenSlot,
}

impl PenMap {
    pub fn new(default_pen: PenSlot) -> Self {
        PenMap {
            colors: Vec::new(),
            default_pen,
        }
    }

    /// The pen for a path with the given stroke and fill colors, or `None`
    /// if the path shouldn't be drawn.
    ///
    /// Stroked paths are drawn in their stroke color. Filled shapes without
    /// a stroke are skipped, and paths with neither are drawn in black.
    pub fn pen_for(&mut self, stroke: Option<&str>, fill: Option<&str>) -> Option<PenSlot> {
        let color = match (stroke, fill) {
            (Some(stroke), _) => stroke,
            (None, Some(_)) => return None,
            (None, None) => "#000000",
        };
        if let Some((_, pen)) = self.colors.iter().find(|(c, _)| c == color) {
            return Some(*pen);
        }
        match PenSlot::ALL.get(self.colors.len()) {
            Some(&pen) => {
                self.colors.push((color.to_owned(), pen));
                Some(pen)
            }
            None => Some(self.default_pen),
        }
    }

    /// The colors that got a pen of their own.
    pub fn assigned(&self) -> &[(String, PenSlot)] {
        &self.colors
    }
}

fn color_name(paint: &Paint) -> String {
    match paint {
        Paint::Color(c) => format!("#{:02x}{:02x}{:02x}", c.red, c.green, c.blue),
        // Gradients and patterns get the pen for black.
        _ => "#000000".to_owned(),
    }
}

pub fn load_svg(path: &Path, default_pen: PenSlot) -> anyhow::Result<(Vec<PenStroke>, PenMap)> {
    let data = std::fs::read(path)?;
    parse_svg(&data, default_pen)
}

fn sets_paint(node: roxmltree::Node) -> bool {
    if node.has_attribute("fill") || node.has_attribute("stroke") {
        return true;
    }
    node.attribute("style").is_some_and(|style| {
        style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .any(|(name, _)| matches!(name.trim(), "fill" | "stroke"))
    })
}

/// Gives every shape that has no paint of its own (or inherited) an explicit
/// black stroke and no fill. Left alone, usvg would give it the default black
/// fill and we'd skip it.
fn stroke_unpainted(text: &str) -> anyhow::Result<String> {
    let opt = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, opt)?;

    let mut ret = String::with_capacity(text.len());
    let mut copied = 0;
    for node in doc.descendants() {
        if !node.is_element()
            || !SHAPES.contains(&node.tag_name().name())
            || node.ancestors().any(sets_paint)
        {
            continue;
        }
        // Just after the tag name.
        let start = node.range().start;
        let at = text[start..]
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .map_or(text.len(), |i| start + i);
        if at < copied {
            continue;
        }
        ret.push_str(&text[copied..at]);
        ret.push_str(BLACK_STROKE);
        copied = at;
    }
    ret.push_str(&text[copied..]);
    Ok(ret)
}

pub fn parse_svg(data: &[u8], default_pen: PenSlot) -> anyhow::Result<(Vec<PenStroke>, PenMap)> {
    let text = if data.starts_with(&[0x1f, 0x8b]) {
        String::from_utf8(usvg::decompress_svgz(data)?)?
    } else {
        std::str::from_utf8(data)?.to_owned()
    };
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(&stroke_unpainted(&text)?, &opt)?;
    let mut pens = PenMap::new(default_pen);
    let mut ret = Vec::new();

    let cvt = |pt: usvg::tiny_skia_path::Point| kurbo::Point::new(pt.x as f64, pt.y as f64);

    for node in tree.root.descendants() {
        // Paths don't carry transforms in usvg; their parent group does.
        let transform = node.abs_transform();
        let usvg::NodeKind::Path(p) = &*node.borrow() else {
            continue;
        };
        let stroke = p.stroke.as_ref().map(|s| color_name(&s.paint));
        let fill = p.fill.as_ref().map(|f| color_name(&f.paint));
        let Some(pen) = pens.pen_for(stroke.as_deref(), fill.as_deref()) else {
            log::debug!("skipping filled path {:?}", p.id);
            continue;
        };

        let mut bez = BezPath::new();
        for seg in p.data.segments() {
            match seg {
                PathSegment::MoveTo(mut pt) => {
                    transform.map_point(&mut pt);
                    bez.move_to(cvt(pt));
                }
                PathSegment::LineTo(mut pt) => {
                    transform.map_point(&mut pt);
                    bez.line_to(cvt(pt));
                }
                PathSegment::QuadTo(mut pt1, mut pt2) => {
                    transform.map_point(&mut pt1);
                    transform.map_point(&mut pt2);
                    bez.quad_to(cvt(pt1), cvt(pt2));
                }
                PathSegment::CubicTo(mut pt1, mut pt2, mut pt3) => {
                    transform.map_point(&mut pt1);
                    transform.map_point(&mut pt2);
                    transform.map_point(&mut pt3);
                    bez.curve_to(cvt(pt1), cvt(pt2), cvt(pt3));
                }
                PathSegment::Close => bez.close_path(),
            }
        }
        ret.extend(
            Stroke::from_bez_path(&bez)
                .into_iter()
                .map(|stroke| PenStroke { stroke, pen }),
        );
    }
    Ok((ret, pens))
}

impl std::fmt::Display for PenMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (color, pen)) in self.colors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{color} -> {pen}")?;
        }
        Ok(())
    }
}
