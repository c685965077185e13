use super::curve::ParametricCurve2d;
use super::{heading, Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A straight line segment, parameterised by `t` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment2d {
    start: Point2d,
    end: Point2d,
}

impl LineSegment2d {
    /// Creates a line segment between two points.
    pub const fn from_ends(start: Point2d, end: Point2d) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> Point2d {
        self.start
    }

    pub fn end(&self) -> Point2d {
        self.end
    }

    /// The length of the segment.
    pub fn length(&self) -> f64 {
        (self.end - self.start).magnitude()
    }

    /// The unit vector pointing from the start to the end of the segment.
    pub fn direction(&self) -> Vector2d {
        (self.end - self.start).normalize()
    }

    /// The heading of the segment in radians.
    pub fn heading(&self) -> f64 {
        heading(self.end - self.start)
    }

    /// The point at the given distance from the start, clamped to the segment.
    pub fn point_at(&self, distance: f64) -> Point2d {
        let length = self.length();
        if length == 0.0 {
            return self.start;
        }
        self.sample((distance / length).clamp(0.0, 1.0))
    }

    /// The distance along the segment of the point on it closest to `point`.
    pub fn project(&self, point: Point2d) -> f64 {
        let length = self.length();
        if length == 0.0 {
            return 0.0;
        }
        (point - self.start).dot(self.direction()).clamp(0.0, length)
    }

    /// The shortest distance between `point` and the segment.
    pub fn distance_to(&self, point: Point2d) -> f64 {
        point.distance(self.point_at(self.project(point)))
    }
}

impl ParametricCurve2d for LineSegment2d {
    fn sample(&self, t: f64) -> Point2d {
        self.start + (self.end - self.start) * t
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, 1.0)
    }

    fn sample_dt(&self, _t: f64) -> Vector2d {
        self.end - self.start
    }
}
