use super::{Point2d, Vector2d};
use std::f64::consts::TAU;

/// Rotates a vector 90 degrees clockwise.
///
/// All geometry uses screen coordinates (y pointing south), so this maps
/// a direction of travel onto its right-hand side.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// The heading of a vector in radians, in the range `(-π, π]`.
pub fn heading(vec: Vector2d) -> f64 {
    vec.y.atan2(vec.x)
}

/// A unit vector pointing along the given heading.
pub fn from_heading(heading: f64) -> Vector2d {
    Vector2d::new(heading.cos(), heading.sin())
}

/// Reduces an angle to the range `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let angle = angle.rem_euclid(TAU);
    // `rem_euclid` may round up to exactly `TAU` for tiny negative inputs
    if angle >= TAU {
        0.0
    } else {
        angle
    }
}

/// The angle of `point` around `centre`, in the range `[0, 2π)`.
pub fn angle_around(centre: Point2d, point: Point2d) -> f64 {
    normalize_angle(heading(point - centre))
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    #[test]
    fn normalized_angles_are_in_range() {
        assert_approx_eq!(normalize_angle(-0.5 * PI), 1.5 * PI);
        assert_approx_eq!(normalize_angle(2.5 * PI), 0.5 * PI);
        assert_eq!(normalize_angle(TAU), 0.0);
        assert_eq!(normalize_angle(0.0), 0.0);
    }

    #[test]
    fn rot90_turns_north_to_east() {
        // North is -y in screen coordinates
        let east = rot90(Vector2d::new(0.0, -1.0));
        assert_approx_eq!(east.x, 1.0);
        assert_approx_eq!(east.y, 0.0);
    }
}
