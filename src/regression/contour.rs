//! Level-set extraction for decision fields (marching squares).
//!
//! Turns the sampled score field into ordered polylines a renderer can draw directly.
//! Every branch of the level set is returned, not just the first one.

use std::collections::HashMap;

use crate::common_types::Point;
use crate::regression::logistic::DecisionField;

/// A cell edge of the sampling lattice.
/// `Horizontal(i, j)` joins nodes `(i, j)` and `(i + 1, j)`;
/// `Vertical(i, j)` joins nodes `(i, j)` and `(i, j + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    Horizontal(usize, usize),
    Vertical(usize, usize),
}

struct Tracer<'a> {
    field: &'a DecisionField,
    level: f64,
}

impl Tracer<'_> {
    fn above(&self, i: usize, j: usize) -> bool {
        self.field.value_at(i, j) >= self.level
    }

    fn ends(edge: Edge) -> ((usize, usize), (usize, usize)) {
        match edge {
            Edge::Horizontal(i, j) => ((i, j), (i + 1, j)),
            Edge::Vertical(i, j) => ((i, j), (i, j + 1)),
        }
    }

    fn crosses(&self, edge: Edge) -> bool {
        let ((i0, j0), (i1, j1)) = Self::ends(edge);
        self.above(i0, j0) != self.above(i1, j1)
    }

    /// Linear interpolation of the level position along a crossing edge.
    fn crossing_point(&self, edge: Edge) -> Point {
        let ((i0, j0), (i1, j1)) = Self::ends(edge);
        let v0 = self.field.value_at(i0, j0);
        let v1 = self.field.value_at(i1, j1);
        // Endpoints lie on opposite sides, so v0 != v1.
        let t = (self.level - v0) / (v1 - v0);
        let (x0, y0) = (self.field.xs[i0], self.field.ys[j0]);
        let (x1, y1) = (self.field.xs[i1], self.field.ys[j1]);
        Point::new(x0 + t * (x1 - x0), y0 + t * (y1 - y0))
    }

    /// Segments inside cell `(i, j)`, each joining two crossed edges.
    fn cell_segments(&self, i: usize, j: usize, out: &mut Vec<(Edge, Edge)>) {
        let bottom = Edge::Horizontal(i, j);
        let right = Edge::Vertical(i + 1, j);
        let top = Edge::Horizontal(i, j + 1);
        let left = Edge::Vertical(i, j);

        let crossed: Vec<Edge> = [bottom, right, top, left].into_iter().filter(|&e| self.crosses(e)).collect();
        match crossed.len() {
            2 => out.push((crossed[0], crossed[1])),
            4 => {
                // Saddle: the centre value decides which diagonal corners are connected.
                let centre = (self.field.value_at(i, j)
                    + self.field.value_at(i + 1, j)
                    + self.field.value_at(i + 1, j + 1)
                    + self.field.value_at(i, j + 1))
                    / 4.0;
                if (centre >= self.level) == self.above(i, j) {
                    out.push((bottom, right));
                    out.push((top, left));
                } else {
                    out.push((left, bottom));
                    out.push((right, top));
                }
            }
            _ => {}
        }
    }
}

/// Polylines tracing `field == level`. Open branches run border to border, closed loops
/// repeat their first vertex at the end. Longest polyline first.
pub fn level_polylines(field: &DecisionField, level: f64) -> Vec<Vec<Point>> {
    let nx = field.xs.len();
    let ny = field.ys.len();
    if nx < 2 || ny < 2 || field.values.len() != ny || field.values.iter().any(|row| row.len() != nx) {
        return Vec::new();
    }
    let tracer = Tracer { field, level };

    let mut segments = Vec::new();
    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            tracer.cell_segments(i, j, &mut segments);
        }
    }

    let mut by_edge: HashMap<Edge, Vec<usize>> = HashMap::new();
    for (s, &(a, b)) in segments.iter().enumerate() {
        by_edge.entry(a).or_default().push(s);
        by_edge.entry(b).or_default().push(s);
    }

    let mut used = vec![false; segments.len()];
    let mut polylines = Vec::new();

    // Open branches first: they start on an edge touched by a single segment (the border).
    let mut starts: Vec<(usize, Edge)> = Vec::new();
    for (s, &(a, b)) in segments.iter().enumerate() {
        if by_edge[&a].len() == 1 {
            starts.push((s, a));
        }
        if by_edge[&b].len() == 1 {
            starts.push((s, b));
        }
    }
    starts.extend(segments.iter().enumerate().map(|(s, &(a, _))| (s, a)));

    for (first, from) in starts {
        if used[first] {
            continue;
        }
        let mut polyline = vec![tracer.crossing_point(from)];
        let mut segment = first;
        let mut at = from;
        loop {
            used[segment] = true;
            let (a, b) = segments[segment];
            let next_edge = if a == at { b } else { a };
            polyline.push(tracer.crossing_point(next_edge));
            match by_edge[&next_edge].iter().find(|&&s| !used[s]) {
                Some(&s) => {
                    segment = s;
                    at = next_edge;
                }
                None => break,
            }
        }
        polylines.push(polyline);
    }

    polylines.sort_by(|a, b| b.len().cmp(&a.len()));
    polylines
}

/// The decision boundary: zero-level set of the score field.
pub fn zero_level_polylines(field: &DecisionField) -> Vec<Vec<Point>> {
    level_polylines(field, 0.0)
}
