//! Rebuilds absolute edges from a shape's delta-encoded records and files
//! them by the style they are drawn with.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{trace, warn};

use crate::{
    error::Result,
    shape::{
        Shape, ShapeStyles,
        records::{ShapeRecord, StyleChangeData},
    },
    types::{Point, Rectangle, Twips},
};

/// Which side of the edge the filed fill lies on. Fill1 edges keep the
/// recorded direction; fill0 edges are stored reversed so every contour of a
/// fill winds the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Winding {
    Forward,
    Reverse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub start: Point,
    pub end: Point,
    /// Quadratic control point of a curved edge.
    pub control: Option<Point>,
    pub fill_style_0: u32,
    pub fill_style_1: u32,
    pub line_style: u32,
    pub winding: Winding,
}

impl Edge {
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            winding: match self.winding {
                Winding::Forward => Winding::Reverse,
                Winding::Reverse => Winding::Forward,
            },
            ..*self
        }
    }

    /// Samples the edge as `resolution` points in pixels, both ends included.
    /// Curves go through their cubic form, with handles 2/3 of the way from
    /// each end toward the control point.
    pub fn flatten(&self, resolution: usize) -> Vec<(f64, f64)> {
        let (x0, y0) = self.start.to_pixels();
        let (x3, y3) = self.end.to_pixels();
        let Some(control) = self.control else {
            return vec![(x0, y0), (x3, y3)];
        };
        let (cx, cy) = control.to_pixels();
        let (x1, y1) = (x0 + (cx - x0) * 2.0 / 3.0, y0 + (cy - y0) * 2.0 / 3.0);
        let (x2, y2) = (x3 + (cx - x3) * 2.0 / 3.0, y3 + (cy - y3) * 2.0 / 3.0);

        let resolution = resolution.max(2);
        (0..resolution)
            .map(|i| {
                let t = i as f64 / (resolution - 1) as f64;
                let s = 1.0 - t;
                let b0 = s * s * s;
                let b1 = 3.0 * s * s * t;
                let b2 = 3.0 * s * t * t;
                let b3 = t * t * t;
                (
                    b0 * x0 + b1 * x1 + b2 * x2 + b3 * x3,
                    b0 * y0 + b1 * y1 + b2 * y2 + b3 * y3,
                )
            })
            .collect()
    }

    /// Tight bounds, including the extremes of a curve.
    pub fn bounds(&self) -> Rectangle {
        let mut bounds = Rectangle::empty();
        bounds.encompass(self.start);
        bounds.encompass(self.end);
        if let Some(control) = self.control {
            let x = quadratic_extreme(self.start.x, control.x, self.end.x);
            let y = quadratic_extreme(self.start.y, control.y, self.end.y);
            if let Some(x) = x {
                bounds.x_min = bounds.x_min.min(x);
                bounds.x_max = bounds.x_max.max(x);
            }
            if let Some(y) = y {
                bounds.y_min = bounds.y_min.min(y);
                bounds.y_max = bounds.y_max.max(y);
            }
        }
        bounds
    }
}

/// The curve's turning point on one axis, if the control point lies outside
/// the span of the end points.
fn quadratic_extreme(from: Twips, control: Twips, to: Twips) -> Option<Twips> {
    let (from, control, to) = (f64::from(from.get()), f64::from(control.get()), f64::from(to.get()));
    if control >= from.min(to) && control <= from.max(to) {
        return None;
    }
    let t = ((from - control) / (from - control * 2.0 + to)).clamp(0.0, 1.0);
    let s = 1.0 - t;
    let value = s * s * from + s * 2.0 * t * control + t * t * to;
    Some(Twips::new(value.round() as i32))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StyleKind {
    Fill,
    Line,
}

/// A style change that referenced past the end of its style table. Edges
/// drawn under it are not filed for that side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidStyleIndex {
    pub kind: StyleKind,
    pub index: u32,
    pub num_styles: u32,
}

impl std::fmt::Display for InvalidStyleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            StyleKind::Fill => "fill",
            StyleKind::Line => "line",
        };
        write!(
            f,
            "{} style index {} out of range ({} styles)",
            kind, self.index, self.num_styles
        )
    }
}

/// Style index → edges drawn with it, in record order.
pub type EdgeMap = IndexMap<u32, Vec<Edge>>;

/// Edges drawn under one style vocabulary. A shape that swaps in new style
/// tables mid-stream produces one group per table.
#[derive(Clone, Debug, Default)]
pub struct EdgeMapGroup {
    pub styles: ShapeStyles,
    /// Key 0 collects the edges whose fill1 side is empty but whose fill0 side
    /// is filled, treated as holes.
    pub fills: EdgeMap,
    pub lines: EdgeMap,
    pub invalid_styles: Vec<InvalidStyleIndex>,
}

impl EdgeMapGroup {
    fn new(styles: ShapeStyles) -> Self {
        Self {
            styles,
            fills: EdgeMap::new(),
            lines: EdgeMap::new(),
            invalid_styles: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty() && self.lines.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.fills.values().chain(self.lines.values()).flatten()
    }
}

struct EdgeMapBuilder {
    groups: Vec<EdgeMapGroup>,
    current: EdgeMapGroup,
    position: Point,
    fill_style_0: u32,
    fill_style_1: u32,
    line_style: u32,
    /// The active fill1 index is out of range; its side is left unfiled
    /// instead of being taken for a hole.
    invalid_fill_1: bool,
}

impl EdgeMapBuilder {
    fn new(styles: ShapeStyles) -> Self {
        Self {
            groups: Vec::new(),
            current: EdgeMapGroup::new(styles),
            position: Point::ZERO,
            fill_style_0: 0,
            fill_style_1: 0,
            line_style: 0,
            invalid_fill_1: false,
        }
    }

    fn style_change(&mut self, change: StyleChangeData) {
        if let Some(move_to) = change.move_to {
            self.position = move_to;
        }

        if let Some(styles) = change.new_styles {
            let mut previous = std::mem::replace(&mut self.current, EdgeMapGroup::new(styles));
            if previous.is_empty() {
                self.current.invalid_styles.append(&mut previous.invalid_styles);
            } else {
                self.groups.push(previous);
            }
            trace!("Edge map group {} started", self.groups.len());
        }

        let num_fills = self.current.styles.fill_styles.len() as u32;
        let num_lines = self.current.styles.line_styles.len() as u32;
        // Indices are 1-based with 0 meaning "none".
        let mut check = |index: u32, kind: StyleKind| {
            let num_styles = match kind {
                StyleKind::Fill => num_fills,
                StyleKind::Line => num_lines,
            };
            if index <= num_styles {
                return Some(index);
            }
            let invalid = InvalidStyleIndex {
                kind,
                index,
                num_styles,
            };
            warn!("{}", invalid);
            self.current.invalid_styles.push(invalid);
            None
        };
        if let Some(index) = change.fill_style_0 {
            self.fill_style_0 = check(index, StyleKind::Fill).unwrap_or(0);
        }
        if let Some(index) = change.fill_style_1 {
            let checked = check(index, StyleKind::Fill);
            self.invalid_fill_1 = checked.is_none();
            self.fill_style_1 = checked.unwrap_or(0);
        }
        if let Some(index) = change.line_style {
            self.line_style = check(index, StyleKind::Line).unwrap_or(0);
        }
    }

    fn add_edge(&mut self, control: Option<Point>, end: Point) {
        let edge = Edge {
            start: self.position,
            end,
            control,
            fill_style_0: self.fill_style_0,
            fill_style_1: self.fill_style_1,
            line_style: self.line_style,
            winding: Winding::Forward,
        };
        self.position = end;

        if !self.invalid_fill_1 && (edge.fill_style_1 != 0 || edge.fill_style_0 != 0) {
            self.current
                .fills
                .entry(edge.fill_style_1)
                .or_default()
                .push(edge);
        }
        if edge.fill_style_0 != 0 {
            self.current
                .fills
                .entry(edge.fill_style_0)
                .or_default()
                .push(edge.reversed());
        }
        if edge.line_style != 0 {
            self.current
                .lines
                .entry(edge.line_style)
                .or_default()
                .push(edge);
        }
    }

    fn finish(mut self) -> Vec<EdgeMapGroup> {
        if !self.current.is_empty() || self.groups.is_empty() {
            self.groups.push(self.current);
        }
        self.groups
    }
}

/// Walks the shape's records once, producing one [`EdgeMapGroup`] per style
/// vocabulary. The draw position starts at the shape origin and carries
/// across groups.
pub fn build_edge_maps(shape: &Shape<'_>) -> Result<Vec<EdgeMapGroup>> {
    let mut builder = EdgeMapBuilder::new(shape.styles.clone());
    for record in shape.records.iter() {
        match record? {
            ShapeRecord::StyleChange(change) => builder.style_change(*change),
            ShapeRecord::StraightEdge { delta, .. } => {
                let end = builder.position + delta;
                builder.add_edge(None, end);
            }
            ShapeRecord::CurvedEdge {
                control_delta,
                anchor_delta,
            } => {
                let control = builder.position + control_delta;
                builder.add_edge(Some(control), control + anchor_delta);
            }
            ShapeRecord::End => break,
        }
    }
    let groups = builder.finish();
    trace!("Shape {}: {} edge map group(s)", shape.id, groups.len());
    Ok(groups)
}

/// Bounds of every edge in every group, or a zero rectangle for an empty shape.
pub fn calculate_edge_bounds(groups: &[EdgeMapGroup]) -> Rectangle {
    let bounds = groups
        .iter()
        .flat_map(EdgeMapGroup::edges)
        .map(Edge::bounds)
        .fold(Rectangle::empty(), |mut acc, b| {
            acc.encompass(Point::new(b.x_min, b.y_min));
            acc.encompass(Point::new(b.x_max, b.y_max));
            acc
        });
    if bounds.is_valid() { bounds } else { Rectangle::default() }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        shape::FillStyle,
        testing::{ShapeBuilder, decode_shape},
        types::Color,
    };

    fn pt(x: i32, y: i32) -> Point {
        Point::new(Twips::new(x), Twips::new(y))
    }

    #[test]
    fn single_edge_is_filed_under_fill1() -> anyhow::Result<()> {
        let body = ShapeBuilder::new(1, 3, &[Color::BLACK], &[])
            .style_change(None, None, Some(1), None)
            .straight(100, 0)
            .body();
        let groups = build_edge_maps(&decode_shape(&body)?)?;
        assert_eq!(groups.len(), 1);
        let fills = &groups[0].fills;
        assert_eq!(fills.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(fills[&1].len(), 1);
        assert_eq!((fills[&1][0].start, fills[&1][0].end), (pt(0, 0), pt(100, 0)));
        assert!(groups[0].lines.is_empty());
        Ok(())
    }

    #[test]
    fn fill0_edges_are_reversed_copies() -> anyhow::Result<()> {
        // Two squares sharing the seam x=100: left has fill 1, right has fill 2.
        let body = ShapeBuilder::new(1, 3, &[Color::BLACK, Color::WHITE], &[])
            .style_change(Some((0, 0)), None, Some(1), None)
            .straight(100, 0)
            .style_change(None, Some(2), Some(1), None)
            .straight(0, 100)
            .style_change(None, Some(0), Some(1), None)
            .straight(-100, 0)
            .straight(0, -100)
            .style_change(Some((100, 0)), None, Some(2), None)
            .straight(100, 0)
            .straight(0, 100)
            .straight(-100, 0)
            .body();
        let groups = build_edge_maps(&decode_shape(&body)?)?;
        let fills = &groups[0].fills;

        let seam = fills[&1]
            .iter()
            .find(|e| e.start == pt(100, 0) && e.end == pt(100, 100))
            .copied();
        assert!(seam.is_some());
        let reversed = fills[&2]
            .iter()
            .filter(|e| e.start == pt(100, 100) && e.end == pt(100, 0))
            .collect::<Vec<_>>();
        assert_eq!(reversed.len(), 1);
        assert_eq!(reversed[0].winding, Winding::Reverse);
        assert!(!fills.contains_key(&0));
        Ok(())
    }

    #[test]
    fn fill0_only_edges_are_holes() -> anyhow::Result<()> {
        let body = ShapeBuilder::new(1, 3, &[Color::BLACK], &[(20, Color::BLACK)])
            .style_change(None, Some(1), None, Some(1))
            .straight(10, 0)
            .style_change(None, Some(0), None, None)
            .straight(10, 0)
            .body();
        let groups = build_edge_maps(&decode_shape(&body)?)?;
        let group = &groups[0];
        assert_eq!(group.fills[&0].len(), 1);
        assert_eq!(group.fills[&1].len(), 1);
        // The stroke-only edge never enters the fill map.
        assert_eq!(group.lines[&1].len(), 2);
        assert_eq!(group.fills.values().map(Vec::len).sum::<usize>(), 2);
        Ok(())
    }

    #[test]
    fn new_styles_start_a_new_group() -> anyhow::Result<()> {
        let body = ShapeBuilder::new(1, 3, &[Color::BLACK], &[])
            .style_change(None, None, Some(1), None)
            .straight(100, 0)
            .new_styles(&[Color::WHITE], &[], Some(1), None)
            .straight(0, 100)
            .body();
        let groups = build_edge_maps(&decode_shape(&body)?)?;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].fills[&1].len(), 1);
        assert_eq!(groups[1].fills[&1].len(), 1);
        // Same index, different vocabularies, and the position carries over.
        assert_eq!(groups[1].styles.fill_styles[0], FillStyle::Color(Color::WHITE));
        assert_eq!(groups[1].fills[&1][0].start, pt(100, 0));
        Ok(())
    }

    #[test]
    fn out_of_range_style_falls_back_to_none() -> anyhow::Result<()> {
        let body = ShapeBuilder::new(1, 3, &[Color::BLACK], &[])
            .style_change(None, None, Some(1), None)
            .new_styles(&[Color::BLACK, Color::WHITE], &[], None, None)
            .style_change(None, None, Some(3), None)
            .straight(10, 10)
            .body();
        let groups = build_edge_maps(&decode_shape(&body)?)?;
        assert_eq!(groups.len(), 1);
        assert!(groups[0].is_empty());
        assert_eq!(
            groups[0].invalid_styles,
            vec![InvalidStyleIndex {
                kind: StyleKind::Fill,
                index: 3,
                num_styles: 2,
            }]
        );
        Ok(())
    }

    #[test]
    fn out_of_range_fill1_is_not_a_hole() -> anyhow::Result<()> {
        // four initial fills so the index 3 fits the old bit width
        let body = ShapeBuilder::new(1, 3, &[Color::BLACK; 4], &[])
            .new_styles(&[Color::WHITE], &[], Some(3), None)
            .style_change(None, Some(1), None, None)
            .straight(100, 0)
            .straight(0, 100)
            .straight(-100, -100)
            .body();
        let groups = build_edge_maps(&decode_shape(&body)?)?;
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert!(!group.fills.contains_key(&0));
        assert_eq!(group.fills.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(group.fills[&1].len(), 3);
        assert!(group.fills[&1].iter().all(|e| e.winding == Winding::Reverse));
        assert_eq!(group.invalid_styles.len(), 1);
        assert_eq!(
            group.invalid_styles[0].to_string(),
            "fill style index 3 out of range (1 styles)"
        );
        Ok(())
    }

    #[test]
    fn curve_bounds_include_extremes() {
        let edge = Edge {
            start: pt(0, 0),
            end: pt(100, 0),
            control: Some(pt(50, -100)),
            fill_style_0: 0,
            fill_style_1: 1,
            line_style: 0,
            winding: Winding::Forward,
        };
        let bounds = edge.bounds();
        assert_eq!((bounds.x_min, bounds.x_max), (Twips::new(0), Twips::new(100)));
        assert_eq!((bounds.y_min, bounds.y_max), (Twips::new(-50), Twips::new(0)));
        assert_eq!(calculate_edge_bounds(&[]), Rectangle::default());
    }

    #[test]
    fn flatten_follows_the_curve() {
        let edge = Edge {
            start: pt(0, 0),
            end: pt(200, 0),
            control: Some(pt(100, 200)),
            fill_style_0: 0,
            fill_style_1: 0,
            line_style: 1,
            winding: Winding::Forward,
        };
        let points = edge.flatten(12);
        assert_eq!(points.len(), 12);
        assert_eq!(points[0], (0.0, 0.0));
        assert_eq!(points[11], (10.0, 0.0));
        // The cubic form has its peak at half the control height.
        let peak = points.iter().map(|p| p.1).fold(f64::MIN, f64::max);
        assert!(peak > 4.5 && peak <= 5.0);

        let straight = Edge { control: None, ..edge };
        assert_eq!(straight.flatten(12).len(), 2);
    }
}
