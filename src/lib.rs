//! # face-warp
//!
//! Geometric normalization of landmark-annotated images.
//!
//! Given a set of 2D landmark points and a bounding region per image, this
//! crate:
//!
//! - learns a canonical **mean shape** from a training population and solves
//!   the orthogonal Procrustes problem (via SVD) to align new point sets
//!   onto it ([`MeanShape`], [`ShapeAligner`]);
//! - builds a **Delaunay triangulation** over the landmark constellation
//!   ([`TriangleMesher`]);
//! - resamples the image with a **piecewise-affine warp**, moving each mesh
//!   triangle independently into the aligned frame and compositing the
//!   patches under a first-writer-wins overlap rule ([`MeshWarp`]).
//!
//! The result is an image whose facial (or object) geometry is consistent
//! regardless of pose, scale, or in-plane rotation, ready for feature
//! extraction or classification.
//!
//! ## Quick start
//!
//! ```rust
//! use face_warp::{
//!     BoundingBox, FaceRecord, GrayImage, ImageAccess, MeanShape, MeshWarp, Point, Shape,
//!     ShapeAligner, TriangleMesher,
//! };
//!
//! // One annotated example: five landmarks plus a face box.
//! let landmarks = Shape::new(vec![
//!     Point::new(24.0, 24.0),
//!     Point::new(40.0, 24.0),
//!     Point::new(32.0, 32.0),
//!     Point::new(26.0, 42.0),
//!     Point::new(38.0, 42.0),
//! ]);
//! let record = FaceRecord::new(landmarks, vec![BoundingBox::new(8.0, 8.0, 48.0, 48.0)]);
//!
//! // Learn the mean shape (normally from a whole population).
//! let mean_shape = MeanShape::train(std::slice::from_ref(&record)).unwrap();
//!
//! // Align, mesh, and warp a record end to end.
//! let image = GrayImage::from_fn(64, 64, |x, y| ((x + y) % 256) as u8);
//! let aligned = ShapeAligner::new(&mean_shape)
//!     .with_warp(false)
//!     .align(record)
//!     .unwrap();
//! let meshed = TriangleMesher::new().triangulate(aligned, 64, 64);
//! let (warped_record, warped) = MeshWarp::new().with_scale_factor(32.0).warp(meshed, &image);
//!
//! assert_eq!(warped.width(), 64);
//! assert!(warped_record.mesh.is_some());
//! assert!(warped_record.alignment.is_some());
//! ```
//!
//! ## Pipeline notes
//!
//! - [`ShapeAligner`] in warp mode replaces the record's landmarks with the
//!   rotated normalized point set (shape-only normalization). For image
//!   warping, align with `with_warp(false)` so the mesher still sees raw
//!   image-space coordinates, then let [`MeshWarp`] resample the pixels.
//! - Per-record failures (missing landmarks, a vertex on the image boundary)
//!   pass the record through unchanged and log a warning via the [`log`]
//!   facade; only malformed training input is a hard error.

mod align;
mod error;
mod image;
mod mesh;
mod normalize;
mod record;
mod render;
mod types;
mod warp;

pub use align::{MeanShape, ShapeAligner};
pub use error::{Error, Result};
pub use image::{sample_bilinear, GrayImage, ImageAccess};
pub use mesh::TriangleMesher;
pub use normalize::{full_point_set, normalize, Normalization};
pub use record::{AlignmentParams, FaceRecord};
pub use render::draw_mesh;
pub use types::{
    triangles_from_points, triangles_to_points, BoundingBox, Point, Shape, Triangle,
};
pub use warp::MeshWarp;
