//! Piecewise-affine image warping.
//!
//! Each mesh triangle is moved independently into the canonical aligned
//! frame: its destination vertices come from the record's alignment
//! parameters, a triangle-to-triangle affine map resamples the source image,
//! and the patches are composited under a first-writer-wins overlap rule.

use log::warn;
use nalgebra::{Matrix3, Vector3};

use crate::image::{sample_bilinear, GrayImage, ImageAccess};
use crate::record::{AlignmentParams, FaceRecord};
use crate::types::{BoundingBox, Point};

/// Inclusive tolerance for the edge-function rasterizer, so pixels on
/// triangle edges are covered.
const EDGE_EPS: f32 = 1e-3;

/// Resamples an image into the canonical aligned frame, one mesh triangle at
/// a time.
#[derive(Debug, Clone)]
pub struct MeshWarp {
    /// Output canvas scale applied to canonical (unit-norm) coordinates.
    scale_factor: f32,
    /// When disabled the image passes through unchanged; the record's mesh
    /// and alignment are left as-is.
    warp: bool,
}

impl Default for MeshWarp {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            warp: true,
        }
    }
}

impl MeshWarp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_warp(mut self, warp: bool) -> Self {
        self.warp = warp;
        self
    }

    /// Warp the source image into the canonical frame described by the
    /// record's alignment parameters, triangle by triangle in mesh order.
    ///
    /// Per triangle: each source vertex is mapped into the canonical frame,
    /// rescaled by the configured factor, and re-centered at half the output
    /// extent; the unique affine map between the three raw source vertices
    /// and those destination vertices then resamples the source into the
    /// rasterized destination triangle. Overlap rule: the first triangle to
    /// write a pixel wins; later triangles never overwrite a non-zero pixel,
    /// so triangle order is load-bearing.
    ///
    /// Afterwards the record's rects are replaced by the axis-aligned
    /// bounding box of all destination vertices used.
    ///
    /// A record missing alignment parameters or a mesh passes through with a
    /// warning and an unmodified copy of the image.
    pub fn warp<I: ImageAccess>(&self, mut record: FaceRecord, image: &I) -> (FaceRecord, GrayImage) {
        if !self.warp {
            return (record, GrayImage::copy_from(image));
        }

        let (Some(alignment), Some(mesh)) = (record.alignment.clone(), record.mesh.clone())
        else {
            warn!("mesh warp skipped: record is missing alignment parameters or a triangle mesh");
            return (record, GrayImage::copy_from(image));
        };

        let width = image.width();
        let height = image.height();
        let mut output = GrayImage::zeros(width, height);
        let mut mapped: Vec<Point> = Vec::with_capacity(mesh.len() * 3);

        for (index, triangle) in mesh.iter().enumerate() {
            let src = *triangle.vertices();
            let dst = src.map(|v| self.destination_vertex(&alignment, v, width, height));
            mapped.extend_from_slice(&dst);

            // Inverse map: destination pixel -> source position. Solving the
            // correspondence in this direction is exactly what an affine
            // image resample does per destination pixel.
            let Some(to_source) = AffineMap::between(&dst, &src) else {
                // Degenerate destination triangle; nothing to draw.
                continue;
            };

            rasterize_triangle(&dst, width, height, |x, y| {
                // First writer wins: only the first triangle may claim a
                // pixel that is already non-zero in the accumulated output.
                if index > 0 && output.get_pixel(x as i32, y as i32) != 0 {
                    return;
                }
                let source_pos = to_source.apply(Point::new(x as f32, y as f32));
                let value = sample_bilinear(image, source_pos);
                output.set_pixel(x as i32, y as i32, value.round().clamp(0.0, 255.0) as u8);
            });
        }

        // The union of warped triangle vertices defines the new bounding
        // region, replacing any previous rects.
        if let Some(bbox) = BoundingBox::enclosing(&mapped) {
            record.rects = vec![bbox];
        }

        (record, output)
    }

    /// Map a raw source vertex to output pixel coordinates: canonical frame,
    /// then display rescale and re-centering.
    fn destination_vertex(
        &self,
        alignment: &AlignmentParams,
        v: Point,
        width: u32,
        height: u32,
    ) -> Point {
        let canonical = alignment.to_canonical(v);
        Point::new(
            canonical.x * self.scale_factor + width as f32 / 2.0,
            canonical.y * self.scale_factor + height as f32 / 2.0,
        )
    }
}

/// A 2D affine transform stored as two rows of (a, b, c) with
/// x' = a*x + b*y + c.
#[derive(Debug, Clone, Copy)]
struct AffineMap {
    row_x: [f32; 3],
    row_y: [f32; 3],
}

impl AffineMap {
    /// The unique affine transform mapping three `from` points onto three
    /// `to` points. Returns `None` when the `from` triangle is degenerate.
    fn between(from: &[Point; 3], to: &[Point; 3]) -> Option<Self> {
        let a = Matrix3::new(
            from[0].x, from[0].y, 1.0, //
            from[1].x, from[1].y, 1.0, //
            from[2].x, from[2].y, 1.0,
        );
        let lu = a.lu();
        let xs = lu.solve(&Vector3::new(to[0].x, to[1].x, to[2].x))?;
        let ys = lu.solve(&Vector3::new(to[0].y, to[1].y, to[2].y))?;
        Some(Self {
            row_x: [xs[0], xs[1], xs[2]],
            row_y: [ys[0], ys[1], ys[2]],
        })
    }

    fn apply(&self, p: Point) -> Point {
        Point::new(
            self.row_x[0] * p.x + self.row_x[1] * p.y + self.row_x[2],
            self.row_y[0] * p.x + self.row_y[1] * p.y + self.row_y[2],
        )
    }
}

/// Visit every pixel covered by a filled triangle, clipped to the image.
///
/// Coverage uses edge functions with a small inclusive tolerance and is
/// winding-independent.
fn rasterize_triangle(tri: &[Point; 3], width: u32, height: u32, mut plot: impl FnMut(u32, u32)) {
    let [a, b, c] = *tri;

    let area = edge_function(a, b, c);
    if area.abs() < f32::EPSILON {
        return;
    }
    let sign = area.signum();

    let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
    let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
    let max_x = (a.x.max(b.x).max(c.x).ceil() as i64).min(width as i64 - 1);
    let max_y = (a.y.max(b.y).max(c.y).ceil() as i64).min(height as i64 - 1);
    if max_x < 0 || max_y < 0 {
        return;
    }

    for y in min_y..=max_y as u32 {
        for x in min_x..=max_x as u32 {
            let p = Point::new(x as f32, y as f32);
            let w0 = edge_function(b, c, p) * sign;
            let w1 = edge_function(c, a, p) * sign;
            let w2 = edge_function(a, b, p) * sign;
            if w0 >= -EDGE_EPS && w1 >= -EDGE_EPS && w2 >= -EDGE_EPS {
                plot(x, y);
            }
        }
    }
}

fn edge_function(a: Point, b: Point, p: Point) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}
