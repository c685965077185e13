use super::curve::ParametricCurve2d;
use super::{from_heading, Point2d, Vector2d};
use crate::util::Interval;

/// A circular arc, parameterised by `t` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc2d {
    centre: Point2d,
    radius: f64,
    start_angle: f64,
    sweep: f64,
}

impl Arc2d {
    /// Creates a new arc.
    ///
    /// # Parameters
    /// * `centre` - The centre of the circle the arc lies on
    /// * `radius` - The radius of that circle
    /// * `start_angle` - The angle of the start point around the centre
    /// * `sweep` - The signed angle swept by the arc
    pub const fn new(centre: Point2d, radius: f64, start_angle: f64, sweep: f64) -> Self {
        Self {
            centre,
            radius,
            start_angle,
            sweep,
        }
    }

    pub fn centre(&self) -> Point2d {
        self.centre
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The length of the arc.
    pub fn length(&self) -> f64 {
        self.radius * self.sweep.abs()
    }
}

impl ParametricCurve2d for Arc2d {
    fn sample(&self, t: f64) -> Point2d {
        self.centre + from_heading(self.start_angle + t * self.sweep) * self.radius
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, 1.0)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let angle = self.start_angle + t * self.sweep;
        Vector2d::new(-angle.sin(), angle.cos()) * (self.radius * self.sweep)
    }
}
