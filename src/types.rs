use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl std::ops::Div<f32> for Point {
    type Output = Self;

    fn div(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x / rhs,
            y: self.y / rhs,
        }
    }
}

/// A bounding box defined by top-left corner, width, and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The four corners in the fixed anchor order:
    /// top-left, top-right, bottom-left, bottom-right.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y),
            Point::new(self.x, self.y + self.height),
            Point::new(self.x + self.width, self.y + self.height),
        ]
    }

    /// Axis-aligned bounding box of a set of points.
    /// Returns `None` for an empty set.
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y) = (first.x, first.y);
        let (mut max_x, mut max_y) = (first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// A shape represented as an ordered collection of 2D points
/// (landmarks, optionally followed by synthetic anchor points).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub points: Vec<Point>,
}

impl Shape {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Create a zeroed shape with n points.
    pub fn zeros(n: usize) -> Self {
        Self {
            points: vec![Point::zero(); n],
        }
    }

    /// Arithmetic mean of all point coordinates.
    pub fn centroid(&self) -> Point {
        let mut sum = Point::zero();
        for p in &self.points {
            sum += *p;
        }
        sum / self.points.len() as f32
    }

    /// Flatten shape to a vector of [x0, y0, x1, y1, ...] coordinates.
    pub fn to_flat_vec(&self) -> Vec<f32> {
        let mut v = Vec::with_capacity(self.points.len() * 2);
        for p in &self.points {
            v.push(p.x);
            v.push(p.y);
        }
        v
    }

    /// Create shape from a flat vector of [x0, y0, x1, y1, ...] coordinates.
    pub fn from_flat_vec(v: &[f32]) -> Self {
        debug_assert!(v.len() % 2 == 0);
        let points: Vec<Point> = v
            .chunks_exact(2)
            .map(|chunk| Point::new(chunk[0], chunk[1]))
            .collect();
        Self { points }
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

impl std::ops::IndexMut<usize> for Shape {
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.points[idx]
    }
}

/// An ordered triple of vertices drawn from a record's full point set.
///
/// Keeping triangles as an explicit value type (rather than a flat coordinate
/// list grouped in threes) makes the draw-order/overlap rule of the warper a
/// property of the sequence of triangles, and grouping corruption impossible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    vertices: [Point; 3],
}

impl Triangle {
    pub const fn new(a: Point, b: Point, c: Point) -> Self {
        Self { vertices: [a, b, c] }
    }

    pub fn vertices(&self) -> &[Point; 3] {
        &self.vertices
    }

    /// Signed area; the sign encodes vertex winding.
    pub fn signed_area(&self) -> f32 {
        let [a, b, c] = self.vertices;
        0.5 * ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x))
    }
}

/// Flatten a triangle list into the wire layout: one point per vertex,
/// three consecutive points per triangle.
pub fn triangles_to_points(triangles: &[Triangle]) -> Vec<Point> {
    let mut out = Vec::with_capacity(triangles.len() * 3);
    for t in triangles {
        out.extend_from_slice(t.vertices());
    }
    out
}

/// Regroup a flat vertex list into triangles.
///
/// # Panics
///
/// Panics if the list length is not a multiple of three; such a list cannot
/// have come from a well-formed triangle sequence.
pub fn triangles_from_points(points: &[Point]) -> Vec<Triangle> {
    assert!(
        points.len() % 3 == 0,
        "flat triangle list length {} is not a multiple of 3",
        points.len()
    );
    points
        .chunks_exact(3)
        .map(|v| Triangle::new(v[0], v[1], v[2]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, 4.0);

        let sum = a + b;
        assert_eq!(sum.x, 4.0);
        assert_eq!(sum.y, 6.0);

        let diff = b - a;
        assert_eq!(diff.x, 2.0);
        assert_eq!(diff.y, 2.0);

        let scaled = a * 2.0;
        assert_eq!(scaled.x, 2.0);
        assert_eq!(scaled.y, 4.0);

        let halved = b / 2.0;
        assert_eq!(halved.x, 1.5);
        assert_eq!(halved.y, 2.0);
    }

    #[test]
    fn bounding_box_corner_order() {
        let bbox = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        let corners = bbox.corners();

        assert_eq!(corners[0], Point::new(10.0, 20.0)); // top-left
        assert_eq!(corners[1], Point::new(110.0, 20.0)); // top-right
        assert_eq!(corners[2], Point::new(10.0, 70.0)); // bottom-left
        assert_eq!(corners[3], Point::new(110.0, 70.0)); // bottom-right
    }

    #[test]
    fn enclosing_box() {
        let points = vec![
            Point::new(5.0, 7.0),
            Point::new(-1.0, 3.0),
            Point::new(4.0, 10.0),
        ];
        let bbox = BoundingBox::enclosing(&points).unwrap();
        assert_eq!(bbox.x, -1.0);
        assert_eq!(bbox.y, 3.0);
        assert_eq!(bbox.width, 6.0);
        assert_eq!(bbox.height, 7.0);

        assert!(BoundingBox::enclosing(&[]).is_none());
    }

    #[test]
    fn default_shape_is_empty() {
        let shape = Shape::default();
        assert!(shape.is_empty());
        assert_eq!(shape.num_points(), 0);
    }

    #[test]
    fn shape_centroid() {
        let shape = Shape::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        let c = shape.centroid();
        assert!((c.x - 1.0).abs() < 1e-6);
        assert!((c.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn shape_flat_roundtrip() {
        let shape = Shape::new(vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
        let flat = shape.to_flat_vec();
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(Shape::from_flat_vec(&flat), shape);
    }

    #[test]
    fn triangle_area_and_winding() {
        let ccw = Triangle::new(
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        );
        assert!((ccw.signed_area() - 8.0).abs() < 1e-6);

        let cw = Triangle::new(
            Point::new(0.0, 0.0),
            Point::new(0.0, 4.0),
            Point::new(4.0, 0.0),
        );
        assert!((cw.signed_area() + 8.0).abs() < 1e-6);
    }

    #[test]
    fn triangle_flat_roundtrip() {
        let triangles = vec![
            Triangle::new(
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
            ),
            Triangle::new(
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
            ),
        ];
        let flat = triangles_to_points(&triangles);
        assert_eq!(flat.len(), 6);
        assert_eq!(triangles_from_points(&flat), triangles);
    }

    #[test]
    #[should_panic]
    fn malformed_flat_triangle_list_panics() {
        let points = vec![Point::zero(), Point::zero()];
        let _ = triangles_from_points(&points);
    }
}
