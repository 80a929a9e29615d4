//! Point-set normalization: centering and scale removal.
//!
//! Both training and inference normalize the same way, so the mean shape and
//! every aligned sample live in a common centered, unit-norm coordinate
//! space.

use crate::error::{Error, Result};
use crate::types::{BoundingBox, Point, Shape};

/// Norms below this are treated as a degenerate (all-coincident) point set.
const MIN_NORM: f32 = 1e-6;

/// A centered, unit-norm shape together with the centroid and scale that were
/// removed from it, so callers can invert the normalization later.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub shape: Shape,
    pub centroid: Point,
    pub norm: f32,
}

/// Build the full point set for a record: landmarks followed by the bounding
/// region's four corners in the fixed anchor order (top-left, top-right,
/// bottom-left, bottom-right).
///
/// The same count and ordering must be used consistently across training and
/// inference for a given landmark configuration.
pub fn full_point_set(landmarks: &Shape, bbox: &BoundingBox) -> Shape {
    let mut points = Vec::with_capacity(landmarks.num_points() + 4);
    points.extend_from_slice(&landmarks.points);
    points.extend_from_slice(&bbox.corners());
    Shape::new(points)
}

/// Center a shape at the origin and scale it to unit L2 norm (treating the
/// point set as one flattened coordinate vector).
///
/// A zero or near-zero norm means all points coincide; that is a fatal
/// precondition violation, not something to silently tolerate.
pub fn normalize(shape: &Shape) -> Result<Normalization> {
    if shape.is_empty() {
        return Err(Error::DegenerateShape { norm: 0.0 });
    }

    let centroid = shape.centroid();
    let mut centered: Vec<Point> = shape.points.iter().map(|p| *p - centroid).collect();

    let norm = centered
        .iter()
        .map(|p| p.x * p.x + p.y * p.y)
        .sum::<f32>()
        .sqrt();
    if norm < MIN_NORM {
        return Err(Error::DegenerateShape { norm });
    }

    for p in &mut centered {
        *p = *p / norm;
    }

    Ok(Normalization {
        shape: Shape::new(centered),
        centroid,
        norm,
    })
}
