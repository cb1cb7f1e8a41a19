//! Chains filed edges into continuous paths.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::{
    shape::edge_map::{Edge, EdgeMap, EdgeMapGroup},
    types::Point,
};

/// Relative tolerance when comparing end points.
pub const REL_TOLERANCE: f64 = 1e-5;
/// Absolute tolerance in pixels, so points near the origin still match.
pub const ABS_TOLERANCE: f64 = 1e-3;

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= (REL_TOLERANCE * a.abs().max(b.abs())).max(ABS_TOLERANCE)
}

pub fn close_points(a: Point, b: Point) -> bool {
    let (ax, ay) = a.to_pixels();
    let (bx, by) = b.to_pixels();
    is_close(ax, bx) && is_close(ay, by)
}

/// Edges where each one starts where the previous one ends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Path {
    pub edges: Vec<Edge>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn start(&self) -> Option<Point> {
        self.edges.first().map(|e| e.start)
    }

    pub fn end(&self) -> Option<Point> {
        self.edges.last().map(|e| e.end)
    }

    pub fn is_closed(&self) -> bool {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => close_points(start, end),
            _ => false,
        }
    }

    /// The whole path as a polyline in pixels without repeated joints.
    pub fn flatten(&self, resolution: usize) -> Vec<(f64, f64)> {
        let mut points: Vec<(f64, f64)> = Vec::new();
        for edge in &self.edges {
            for point in edge.flatten(resolution) {
                let is_repeat = points
                    .last()
                    .is_some_and(|last| is_close(last.0, point.0) && is_close(last.1, point.1));
                if !is_repeat {
                    points.push(point);
                }
            }
        }
        points
    }
}

/// First unused edge starting exactly at `at`, dropping used ones on the way.
fn take_exact(by_start: &mut HashMap<Point, VecDeque<usize>>, used: &[bool], at: Point) -> Option<usize> {
    let candidates = by_start.get_mut(&at)?;
    while let Some(&i) = candidates.front() {
        if !used[i] {
            return Some(i);
        }
        candidates.pop_front();
    }
    None
}

/// Chains the edges of one style into paths.
///
/// Starting from the first unused edge, the next edge is the first unused one
/// (in map order) starting exactly where the current one ends, or failing
/// that, the first one starting within tolerance of it. A path ends when
/// nothing continues it; leftover single edges become one-edge paths.
pub fn create_path_from_edge_map(edges: &[Edge]) -> Vec<Path> {
    let mut by_start: HashMap<Point, VecDeque<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        by_start.entry(edge.start).or_default().push_back(i);
    }
    let mut used = vec![false; edges.len()];
    let mut next_first = 0;
    let mut paths = Vec::new();

    loop {
        while next_first < edges.len() && used[next_first] {
            next_first += 1;
        }
        if next_first == edges.len() {
            break;
        }
        let first = next_first;
        used[first] = true;
        let mut path = vec![edges[first]];
        let mut end = edges[first].end;
        loop {
            let next = take_exact(&mut by_start, &used, end)
                .or_else(|| (0..edges.len()).find(|&i| !used[i] && close_points(edges[i].start, end)));
            let Some(next) = next else {
                break;
            };
            used[next] = true;
            end = edges[next].end;
            path.push(edges[next]);
        }
        paths.push(Path { edges: path });
    }
    paths
}

#[derive(Clone, Debug, Serialize)]
pub struct StylePaths {
    /// 1-based index into the group's style table.
    pub style: u32,
    pub paths: Vec<Path>,
}

/// Assembled paths of one edge map group.
#[derive(Clone, Debug, Default, Serialize)]
pub struct GroupPaths {
    pub fills: Vec<StylePaths>,
    /// Regions to cut out of the fills rather than draw.
    pub holes: Vec<Path>,
    pub lines: Vec<StylePaths>,
}

fn style_paths(map: &EdgeMap) -> Vec<StylePaths> {
    map.iter()
        .filter(|(style, _)| **style != 0)
        .map(|(style, edges)| StylePaths {
            style: *style,
            paths: create_path_from_edge_map(edges),
        })
        .collect()
}

pub fn create_paths(group: &EdgeMapGroup) -> GroupPaths {
    GroupPaths {
        fills: style_paths(&group.fills),
        holes: group
            .fills
            .get(&0)
            .map(|edges| create_path_from_edge_map(edges))
            .unwrap_or_default(),
        lines: style_paths(&group.lines),
    }
}
