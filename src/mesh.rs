//! Delaunay triangulation over a record's full point set.
//!
//! The triangulation partitions the image into regions that the warper can
//! move independently. Construction is the incremental Bowyer-Watson scheme:
//! seed with a synthetic triangle enclosing every vertex, insert points one
//! at a time, and strip anything touching the synthetic vertices at the end.

use log::warn;

use crate::normalize::full_point_set;
use crate::record::FaceRecord;
use crate::types::{Point, Triangle};

/// Triangles with less than this absolute area are slivers from coincident
/// or collinear vertices and are dropped.
const MIN_TRIANGLE_AREA: f32 = 1e-6;

/// Builds a triangle mesh over a record's landmarks and bounding-region
/// corners. Stateless per call.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesher;

impl TriangleMesher {
    pub fn new() -> Self {
        Self
    }

    /// Triangulate the record's full point set against an image extent.
    ///
    /// Every vertex must lie strictly inside the pixel bounds
    /// (0 <= x < width, 0 <= y < height); a vertex on or outside the
    /// boundary makes the whole operation fail non-fatally: the record
    /// passes through unchanged with a warning.
    ///
    /// Triangles whose vertices all fall within the looser closed bounds
    /// [0, width] x [0, height] survive a post-filter and are stored on the
    /// record, in triangulation order, for the warper or a renderer.
    pub fn triangulate(&self, mut record: FaceRecord, width: u32, height: u32) -> FaceRecord {
        let Some(bbox) = record.bounding_region().copied() else {
            warn!("triangulation skipped: record has no bounding region");
            return record;
        };
        if record.landmarks.is_empty() {
            warn!("triangulation skipped: record has no landmark points");
            return record;
        }

        let full = full_point_set(&record.landmarks, &bbox);
        let (w, h) = (width as f32, height as f32);

        // Strict insertion-time bound: the triangulation domain is the open
        // pixel grid.
        for p in &full.points {
            if p.x < 0.0 || p.y < 0.0 || p.x >= w || p.y >= h {
                warn!(
                    "triangulation skipped: point ({}, {}) lies on or outside the {}x{} image boundary",
                    p.x, p.y, width, height
                );
                return record;
            }
        }

        let triangles = delaunay(&full.points);

        // Looser closed-bound filter for the emitted triangles, tolerating
        // vertices that touch the boundary.
        let valid: Vec<Triangle> = triangles
            .into_iter()
            .filter(|t| {
                t.vertices()
                    .iter()
                    .all(|v| v.x >= 0.0 && v.y >= 0.0 && v.x <= w && v.y <= h)
            })
            .collect();

        record.mesh = Some(valid);
        record
    }
}

/// Incremental Bowyer-Watson Delaunay triangulation.
///
/// Output order is deterministic for a given input order. Triangles touching
/// the synthetic enclosing vertices and degenerate slivers are removed.
fn delaunay(points: &[Point]) -> Vec<Triangle> {
    if points.len() < 3 {
        return Vec::new();
    }

    let mut verts: Vec<Point> = points.to_vec();

    // Synthetic triangle comfortably enclosing all input points.
    let bounds = point_bounds(points);
    let dx = bounds.2 - bounds.0;
    let dy = bounds.3 - bounds.1;
    let dmax = dx.max(dy).max(1.0);
    let mid_x = (bounds.0 + bounds.2) / 2.0;
    let mid_y = (bounds.1 + bounds.3) / 2.0;

    let base = verts.len();
    verts.push(Point::new(mid_x - 20.0 * dmax, mid_y - dmax));
    verts.push(Point::new(mid_x, mid_y + 20.0 * dmax));
    verts.push(Point::new(mid_x + 20.0 * dmax, mid_y - dmax));

    let mut tris: Vec<[usize; 3]> = vec![[base, base + 1, base + 2]];

    for i in 0..base {
        let p = verts[i];

        // Triangles whose circumcircle contains the new point form the
        // cavity to be re-triangulated.
        let bad: Vec<usize> = tris
            .iter()
            .enumerate()
            .filter(|(_, t)| in_circumcircle(verts[t[0]], verts[t[1]], verts[t[2]], p))
            .map(|(ti, _)| ti)
            .collect();

        // Cavity boundary: edges of bad triangles not shared with another
        // bad triangle.
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for &ti in &bad {
            let t = tris[ti];
            for edge in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let shared = bad
                    .iter()
                    .any(|&tj| tj != ti && has_edge(&tris[tj], edge));
                if !shared {
                    boundary.push(edge);
                }
            }
        }

        for &ti in bad.iter().rev() {
            tris.remove(ti);
        }
        for (a, b) in boundary {
            tris.push([a, b, i]);
        }
    }

    tris.into_iter()
        .filter(|t| t.iter().all(|&v| v < base))
        .map(|t| Triangle::new(verts[t[0]], verts[t[1]], verts[t[2]]))
        .filter(|t| t.signed_area().abs() > MIN_TRIANGLE_AREA)
        .collect()
}

fn point_bounds(points: &[Point]) -> (f32, f32, f32, f32) {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    (min_x, min_y, max_x, max_y)
}

fn has_edge(t: &[usize; 3], (a, b): (usize, usize)) -> bool {
    let edges = [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])];
    edges
        .iter()
        .any(|&(u, v)| (u == a && v == b) || (u == b && v == a))
}

/// Whether p lies strictly inside the circumcircle of triangle (a, b, c).
///
/// Evaluated as the standard 3x3 in-circle determinant in f64, with the sign
/// normalized against the triangle's winding.
fn in_circumcircle(a: Point, b: Point, c: Point, p: Point) -> bool {
    let ax = (a.x - p.x) as f64;
    let ay = (a.y - p.y) as f64;
    let bx = (b.x - p.x) as f64;
    let by = (b.y - p.y) as f64;
    let cx = (c.x - p.x) as f64;
    let cy = (c.y - p.y) as f64;

    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);

    let orientation = (b.x - a.x) as f64 * (c.y - a.y) as f64
        - (b.y - a.y) as f64 * (c.x - a.x) as f64;

    if orientation > 0.0 {
        det > 0.0
    } else {
        det < 0.0
    }
}
