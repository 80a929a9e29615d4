use nalgebra::Matrix2;

use crate::types::{BoundingBox, Point, Shape, Triangle};

/// Similarity-alignment parameters relating a record's raw point set to the
/// canonical frame of the mean shape.
///
/// Computed once per record by [`crate::ShapeAligner::align`] and consumed by
/// [`crate::MeshWarp`]; it is the single source of truth for how the record's
/// points map into the aligned frame and must not be recomputed downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentParams {
    /// Optimal rotation from the Procrustes solve. May be an improper
    /// rotation (determinant -1) in degenerate configurations; no reflection
    /// correction is applied.
    pub rotation: Matrix2<f32>,
    /// Centroid of the full point set before normalization.
    pub centroid: Point,
    /// L2 norm of the centered point set before normalization.
    pub norm: f32,
}

impl AlignmentParams {
    /// Flatten into the 7-element wire layout used by pipelines that exchange
    /// alignment stats as a numeric list:
    /// `[r00, r10, r11, r01, mean_x, mean_y, norm]`.
    pub fn to_flat(&self) -> [f32; 7] {
        [
            self.rotation[(0, 0)],
            self.rotation[(1, 0)],
            self.rotation[(1, 1)],
            self.rotation[(0, 1)],
            self.centroid.x,
            self.centroid.y,
            self.norm,
        ]
    }

    /// Rebuild from the 7-element wire layout.
    pub fn from_flat(v: &[f32; 7]) -> Self {
        Self {
            rotation: Matrix2::new(v[0], v[3], v[1], v[2]),
            centroid: Point::new(v[4], v[5]),
            norm: v[6],
        }
    }

    /// Map a raw image-space point into the canonical aligned frame:
    /// center, remove scale, then rotate (row vector times R).
    pub fn to_canonical(&self, p: Point) -> Point {
        let x = (p.x - self.centroid.x) / self.norm;
        let y = (p.y - self.centroid.y) / self.norm;
        Point::new(
            x * self.rotation[(0, 0)] + y * self.rotation[(1, 0)],
            x * self.rotation[(0, 1)] + y * self.rotation[(1, 1)],
        )
    }
}

/// Per-image metadata record flowing through the alignment pipeline.
///
/// The derived `alignment` and `mesh` fields are typed and optional, so a
/// missing dependency between pipeline stages is visible at the call site
/// instead of surfacing as an empty lookup in an untyped side-channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceRecord {
    /// Ordered landmark points.
    pub landmarks: Shape,
    /// Rectangular regions; the last one is treated as the primary bounding
    /// region.
    pub rects: Vec<BoundingBox>,
    /// Alignment parameters, present after a successful Procrustes alignment.
    pub alignment: Option<AlignmentParams>,
    /// Triangle mesh over the full point set, present after triangulation.
    pub mesh: Option<Vec<Triangle>>,
}

impl FaceRecord {
    pub fn new(landmarks: Shape, rects: Vec<BoundingBox>) -> Self {
        Self {
            landmarks,
            rects,
            alignment: None,
            mesh: None,
        }
    }

    /// The primary bounding region (the last rect), if any.
    pub fn bounding_region(&self) -> Option<&BoundingBox> {
        self.rects.last()
    }

    /// Whether the record carries the geometry both training and alignment
    /// require: landmark points plus a bounding region.
    pub fn has_geometry(&self) -> bool {
        !self.landmarks.is_empty() && !self.rects.is_empty()
    }
}
