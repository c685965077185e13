use super::{rot90, LineSegment2d, Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;
use smallvec::SmallVec;

/// A convex polygon.
#[derive(Clone, Debug)]
pub struct ConvexPolygon {
    vertices: SmallVec<[Point2d; 4]>,
    /// `1.0` if the vertices wind positively, `-1.0` otherwise.
    winding: f64,
}

impl ConvexPolygon {
    /// Creates a polygon from its vertices, which must be in order
    /// (either winding) and describe a convex shape.
    pub fn new(vertices: &[Point2d]) -> Self {
        assert!(vertices.len() >= 3, "Polygon needs at least three vertices");
        let area2 = vertices
            .iter()
            .zip(vertices.iter().cycle().skip(1))
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>();
        Self {
            vertices: vertices.iter().copied().collect(),
            winding: if area2 >= 0.0 { 1.0 } else { -1.0 },
        }
    }

    /// The rectangle swept by a line segment of the given half width,
    /// lengthened by `extension` at both ends.
    pub fn from_segment(segment: &LineSegment2d, half_width: f64, extension: f64) -> Self {
        let dir = segment.direction();
        let lat = rot90(dir) * half_width;
        let start = segment.start() - dir * extension;
        let end = segment.end() + dir * extension;
        Self::new(&[start - lat, end - lat, end + lat, start + lat])
    }

    pub fn vertices(&self) -> &[Point2d] {
        &self.vertices
    }

    /// The area of the polygon.
    pub fn area(&self) -> f64 {
        self.edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
            .abs()
            * 0.5
    }

    /// Returns true if the point is inside or on the boundary of the polygon.
    pub fn contains(&self, point: Point2d) -> bool {
        self.edges()
            .all(|(a, b)| (point - a).dot(self.outward_normal(a, b)) <= 1e-9)
    }

    /// Clips a line segment against the polygon.
    ///
    /// Returns the range of the segment's `t` parameter (in `[0, 1]`)
    /// which lies inside the polygon, if any.
    pub fn clip(&self, segment: &LineSegment2d) -> Option<Interval<f64>> {
        let origin = segment.start();
        let delta = segment.end() - origin;
        let mut range = Interval::new(0.0, 1.0);

        for (a, b) in self.edges() {
            let normal = self.outward_normal(a, b);
            let num = (a - origin).dot(normal);
            let den = delta.dot(normal);
            if den.abs() < 1e-12 {
                if num < 0.0 {
                    return None;
                }
                continue;
            }
            let t = num / den;
            if den < 0.0 {
                range.min = f64::max(range.min, t);
            } else {
                range.max = f64::min(range.max, t);
            }
            if range.min > range.max {
                return None;
            }
        }

        Some(range)
    }

    fn edges(&self) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        self.vertices
            .iter()
            .copied()
            .zip(self.vertices.iter().copied().cycle().skip(1))
    }

    fn outward_normal(&self, a: Point2d, b: Point2d) -> Vector2d {
        let edge = b - a;
        Vector2d::new(edge.y, -edge.x) * self.winding
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn square() -> ConvexPolygon {
        ConvexPolygon::new(&[
            Point2d::new(0.0, 0.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(10.0, 10.0),
            Point2d::new(0.0, 10.0),
        ])
    }

    #[test]
    fn contains_is_winding_independent() {
        let ccw = square();
        let cw = ConvexPolygon::new(&[
            Point2d::new(0.0, 10.0),
            Point2d::new(10.0, 10.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(0.0, 0.0),
        ]);
        for poly in [ccw, cw] {
            assert!(poly.contains(Point2d::new(5.0, 5.0)));
            assert!(poly.contains(Point2d::new(0.0, 5.0)));
            assert!(!poly.contains(Point2d::new(-1.0, 5.0)));
            assert_approx_eq!(poly.area(), 100.0);
        }
    }

    #[test]
    fn clip_segment_through_square() {
        let segment = LineSegment2d::from_ends(Point2d::new(-10.0, 5.0), Point2d::new(30.0, 5.0));
        let range = square().clip(&segment).unwrap();
        assert_approx_eq!(range.min, 0.25);
        assert_approx_eq!(range.max, 0.5);

        let miss = LineSegment2d::from_ends(Point2d::new(-10.0, 15.0), Point2d::new(30.0, 15.0));
        assert!(square().clip(&miss).is_none());
    }

    #[test]
    fn rectangle_around_segment() {
        let segment = LineSegment2d::from_ends(Point2d::new(0.0, 0.0), Point2d::new(10.0, 0.0));
        let rect = ConvexPolygon::from_segment(&segment, 2.0, 1.0);
        assert_approx_eq!(rect.area(), 48.0);
        assert!(rect.contains(Point2d::new(-0.5, 1.5)));
        assert!(!rect.contains(Point2d::new(11.5, 0.0)));
    }
}
