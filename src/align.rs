//! Statistical shape alignment.
//!
//! Training averages normalized landmark constellations into a mean shape;
//! alignment solves the orthogonal Procrustes problem to find the rotation
//! that best superimposes a new constellation onto that mean.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::warn;
use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize::{full_point_set, normalize};
use crate::record::{AlignmentParams, FaceRecord};
use crate::types::{Point, Shape};

/// Persisted model format version, checked on load.
const MODEL_VERSION: u32 = 1;

/// The canonical reference shape learned from a training population.
///
/// This is the only persisted model state. It is an immutable value: training
/// produces it once, and alignment borrows it read-only, so sharing it across
/// concurrently processed records is safe by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanShape {
    points: Shape,
}

/// On-disk layout: version tag plus the mean shape as a row-major
/// (point_count x 2) coordinate sequence.
#[derive(Serialize, Deserialize)]
struct PersistedMeanShape {
    version: u32,
    point_count: u32,
    coords: Vec<f32>,
}

impl MeanShape {
    /// Train a mean shape from a population of records.
    ///
    /// Records without landmark points or without a bounding region are
    /// skipped. Each usable record contributes its normalized full point set
    /// (landmarks plus bounding-region corners); the mean is the
    /// per-coordinate average across the population.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyTrainingSet`] if no record is usable; a model cannot
    ///   be built from zero examples.
    /// - [`Error::PointCountMismatch`] if records disagree on point count;
    ///   averaging mismatched configurations would silently corrupt the mean.
    /// - [`Error::DegenerateShape`] if a record's points all coincide.
    pub fn train(records: &[FaceRecord]) -> Result<Self> {
        let mut normalized: Vec<Shape> = Vec::new();

        for record in records {
            if !record.has_geometry() {
                continue;
            }
            let Some(bbox) = record.bounding_region().copied() else {
                continue;
            };

            let full = full_point_set(&record.landmarks, &bbox);
            let n = normalize(&full)?;

            if let Some(first) = normalized.first() {
                if first.num_points() != n.shape.num_points() {
                    return Err(Error::PointCountMismatch {
                        expected: first.num_points(),
                        actual: n.shape.num_points(),
                    });
                }
            }
            normalized.push(n.shape);
        }

        if normalized.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }

        let count = normalized.len() as f32;
        let mut mean = Shape::zeros(normalized[0].num_points());
        for shape in &normalized {
            for (m, p) in mean.points.iter_mut().zip(&shape.points) {
                *m += *p;
            }
        }
        for m in &mut mean.points {
            *m = *m / count;
        }

        Ok(Self { points: mean })
    }

    pub fn points(&self) -> &Shape {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.num_points()
    }

    /// Load a persisted mean shape from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let persisted: PersistedMeanShape = bincode::deserialize(&bytes)?;

        if persisted.version != MODEL_VERSION {
            return Err(Error::InvalidModel(format!(
                "unsupported model version {} (expected {})",
                persisted.version, MODEL_VERSION
            )));
        }
        if persisted.coords.len() != persisted.point_count as usize * 2 {
            return Err(Error::InvalidModel(format!(
                "coordinate count {} does not match declared point count {}",
                persisted.coords.len(),
                persisted.point_count
            )));
        }

        Ok(Self {
            points: Shape::from_flat_vec(&persisted.coords),
        })
    }

    /// Save the mean shape to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let persisted = PersistedMeanShape {
            version: MODEL_VERSION,
            point_count: self.points.num_points() as u32,
            coords: self.points.to_flat_vec(),
        };
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = bincode::serialize(&persisted)?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

/// Aligns records onto a mean shape via the orthogonal Procrustes solution.
#[derive(Debug, Clone)]
pub struct ShapeAligner<'a> {
    mean_shape: &'a MeanShape,
    warp: bool,
}

impl<'a> ShapeAligner<'a> {
    pub fn new(mean_shape: &'a MeanShape) -> Self {
        Self {
            mean_shape,
            warp: true,
        }
    }

    /// When enabled (the default), alignment also replaces the record's
    /// landmark points with the rotated normalized point set, so alignment
    /// doubles as an immediate shape-only normalization independent of image
    /// resampling.
    pub fn with_warp(mut self, warp: bool) -> Self {
        self.warp = warp;
        self
    }

    /// Compute the optimal rotation mapping the record's normalized point
    /// set onto the mean shape and attach the resulting
    /// [`AlignmentParams`] to the record.
    ///
    /// The rotation minimizes the sum of squared distances to the mean shape
    /// among all pure rotations: with M = normalizedᵀ·mean and SVD
    /// M = UΣVᵀ, the optimum is R = U·Vᵀ. No reflection correction is
    /// applied, so R may be improper in degenerate configurations.
    ///
    /// A record missing landmarks or a bounding region passes through
    /// unchanged with a warning. A degenerate point set is a fatal error.
    pub fn align(&self, mut record: FaceRecord) -> Result<FaceRecord> {
        let Some(bbox) = record.bounding_region().copied() else {
            warn!("Procrustes alignment skipped: record has no bounding region");
            return Ok(record);
        };
        if record.landmarks.is_empty() {
            warn!("Procrustes alignment skipped: record has no landmark points");
            return Ok(record);
        }

        let full = full_point_set(&record.landmarks, &bbox);
        debug_assert_eq!(full.num_points(), self.mean_shape.num_points());

        let n = normalize(&full)?;

        let m = cross_covariance(&n.shape, self.mean_shape.points());
        let svd = m.svd(true, true);
        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            warn!("Procrustes alignment skipped: SVD did not converge");
            return Ok(record);
        };
        let rotation = u * v_t;

        let params = AlignmentParams {
            rotation,
            centroid: n.centroid,
            norm: n.norm,
        };

        if self.warp {
            record.landmarks = rotate_shape(&n.shape, &rotation);
        }
        record.alignment = Some(params);

        Ok(record)
    }
}

/// 2x2 cross-covariance M = aᵀ·b between two shapes of equal point count,
/// treating each shape as a (point_count x 2) matrix.
fn cross_covariance(a: &Shape, b: &Shape) -> Matrix2<f32> {
    let mut m = Matrix2::zeros();
    for (pa, pb) in a.points.iter().zip(&b.points) {
        m[(0, 0)] += pa.x * pb.x;
        m[(0, 1)] += pa.x * pb.y;
        m[(1, 0)] += pa.y * pb.x;
        m[(1, 1)] += pa.y * pb.y;
    }
    m
}

/// Apply a rotation to every point, as a row vector times R.
fn rotate_shape(shape: &Shape, r: &Matrix2<f32>) -> Shape {
    let points = shape
        .points
        .iter()
        .map(|p| {
            Point::new(
                p.x * r[(0, 0)] + p.y * r[(1, 0)],
                p.x * r[(0, 1)] + p.y * r[(1, 1)],
            )
        })
        .collect();
    Shape::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn sample_record() -> FaceRecord {
        FaceRecord::new(
            Shape::new(vec![
                Point::new(30.0, 30.0),
                Point::new(70.0, 30.0),
                Point::new(50.0, 50.0),
                Point::new(35.0, 70.0),
                Point::new(65.0, 70.0),
            ]),
            vec![BoundingBox::new(20.0, 20.0, 60.0, 60.0)],
        )
    }

    #[test]
    fn training_on_one_record_reproduces_its_normalized_shape() {
        let record = sample_record();
        let mean = MeanShape::train(std::slice::from_ref(&record)).unwrap();

        let full = full_point_set(&record.landmarks, record.bounding_region().unwrap());
        let expected = normalize(&full).unwrap().shape;

        assert_eq!(mean.num_points(), expected.num_points());
        for (m, e) in mean.points().points.iter().zip(&expected.points) {
            assert!((m.x - e.x).abs() < 1e-6);
            assert!((m.y - e.y).abs() < 1e-6);
        }
    }

    #[test]
    fn training_skips_records_without_geometry() {
        let records = vec![FaceRecord::default(), sample_record()];
        let mean = MeanShape::train(&records).unwrap();
        assert_eq!(mean.num_points(), 9); // 5 landmarks + 4 corners
    }

    #[test]
    fn empty_training_set_is_fatal() {
        let records = vec![FaceRecord::default(), FaceRecord::default()];
        let err = MeanShape::train(&records).unwrap_err();
        assert!(matches!(err, Error::EmptyTrainingSet));
    }

    #[test]
    fn mismatched_point_counts_fail_fast() {
        let mut other = sample_record();
        other.landmarks.points.push(Point::new(50.0, 60.0));

        let records = vec![sample_record(), other];
        let err = MeanShape::train(&records).unwrap_err();
        assert!(matches!(
            err,
            Error::PointCountMismatch {
                expected: 9,
                actual: 10
            }
        ));
    }

    #[test]
    fn self_alignment_yields_identity_rotation() {
        let record = sample_record();
        let mean = MeanShape::train(std::slice::from_ref(&record)).unwrap();

        let aligned = ShapeAligner::new(&mean).align(record).unwrap();
        let params = aligned.alignment.expect("alignment params present");

        let r = params.rotation;
        assert!((r[(0, 0)] - 1.0).abs() < 1e-4);
        assert!((r[(1, 1)] - 1.0).abs() < 1e-4);
        assert!(r[(0, 1)].abs() < 1e-4);
        assert!(r[(1, 0)].abs() < 1e-4);
    }

    #[test]
    fn rotated_input_is_mapped_back_onto_the_mean() {
        let record = sample_record();
        let mean = MeanShape::train(std::slice::from_ref(&record)).unwrap();

        // Rotate the landmarks and the bounding-region corners by 30 degrees
        // about the shape centroid; alignment should recover the inverse.
        let angle = 30.0f32.to_radians();
        let (sin, cos) = angle.sin_cos();
        let full = full_point_set(&record.landmarks, record.bounding_region().unwrap());
        let centroid = full.centroid();
        let rotate = |p: Point| {
            let d = p - centroid;
            Point::new(
                d.x * cos - d.y * sin + centroid.x,
                d.x * sin + d.y * cos + centroid.y,
            )
        };

        let rotated_landmarks =
            Shape::new(record.landmarks.points.iter().map(|p| rotate(*p)).collect());
        // Keep the same four corner anchors by rotating them too; the rect
        // itself stays axis-aligned so we pass the corners as extra landmarks.
        let corners = record.bounding_region().unwrap().corners();
        let mut points = rotated_landmarks.points;
        points.extend(corners.iter().map(|p| rotate(*p)));

        let n = normalize(&Shape::new(points)).unwrap();
        let m = cross_covariance(&n.shape, mean.points());
        let svd = m.svd(true, true);
        let r = svd.u.unwrap() * svd.v_t.unwrap();
        let recovered = rotate_shape(&n.shape, &r);

        // After rotation by R the shape should match the mean closely.
        for (a, b) in recovered.points.iter().zip(&mean.points().points) {
            assert!((a.x - b.x).abs() < 1e-3);
            assert!((a.y - b.y).abs() < 1e-3);
        }
    }

    #[test]
    fn align_with_warp_normalizes_landmarks() {
        let record = sample_record();
        let mean = MeanShape::train(std::slice::from_ref(&record)).unwrap();

        let aligned = ShapeAligner::new(&mean).align(record).unwrap();

        // Warp mode replaces landmarks with the rotated normalized full
        // point set: centered at the origin with unit norm.
        assert_eq!(aligned.landmarks.num_points(), 9);
        let c = aligned.landmarks.centroid();
        assert!(c.x.abs() < 1e-5);
        assert!(c.y.abs() < 1e-5);

        let norm: f32 = aligned
            .landmarks
            .points
            .iter()
            .map(|p| p.x * p.x + p.y * p.y)
            .sum::<f32>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn align_without_warp_keeps_landmarks() {
        let record = sample_record();
        let mean = MeanShape::train(std::slice::from_ref(&record)).unwrap();

        let aligned = ShapeAligner::new(&mean)
            .with_warp(false)
            .align(record.clone())
            .unwrap();

        assert_eq!(aligned.landmarks, record.landmarks);
        assert!(aligned.alignment.is_some());
    }

    #[test]
    fn missing_geometry_passes_through_unchanged() {
        let record = sample_record();
        let mean = MeanShape::train(std::slice::from_ref(&record)).unwrap();
        let aligner = ShapeAligner::new(&mean);

        let no_rects = FaceRecord::new(record.landmarks.clone(), vec![]);
        let out = aligner.align(no_rects.clone()).unwrap();
        assert_eq!(out, no_rects);

        let no_points = FaceRecord::new(
            Shape::new(vec![]),
            vec![BoundingBox::new(0.0, 0.0, 10.0, 10.0)],
        );
        let out = aligner.align(no_points.clone()).unwrap();
        assert_eq!(out, no_points);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let record = sample_record();
        let mean = MeanShape::train(std::slice::from_ref(&record)).unwrap();

        let temp_path = std::env::temp_dir().join("face_warp_mean_shape_test.bin");
        mean.save(&temp_path).unwrap();

        let loaded = MeanShape::load(&temp_path).unwrap();
        assert_eq!(loaded, mean);

        std::fs::remove_file(temp_path).ok();
    }

    #[test]
    fn load_rejects_wrong_version() {
        let persisted = PersistedMeanShape {
            version: MODEL_VERSION + 1,
            point_count: 1,
            coords: vec![0.0, 0.0],
        };
        let temp_path = std::env::temp_dir().join("face_warp_bad_version_test.bin");
        std::fs::write(&temp_path, bincode::serialize(&persisted).unwrap()).unwrap();

        let err = MeanShape::load(&temp_path).unwrap_err();
        assert!(matches!(err, Error::InvalidModel(_)));

        std::fs::remove_file(temp_path).ok();
    }
}
