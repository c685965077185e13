//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use cgmath::num_traits::Float;
use serde::{Deserialize, Serialize};

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::ops::Sub<T, Output = T> + Copy> Interval<T> {
    /// Gets the magnitude of the interval.
    pub fn length(&self) -> T {
        self.max - self.min
    }
}

impl<T: Float> Interval<T> {
    pub fn lerp(&self, t: T) -> T {
        self.min + t * (self.max - self.min)
    }

    pub fn inv_lerp(&self, value: T) -> T {
        (value - self.min) / (self.max - self.min)
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// Iterates over `0..count`, starting at `start` and wrapping around.
pub fn rotated_range(count: usize, start: usize) -> impl Iterator<Item = usize> {
    (0..count)
        .map(move |i| i + start)
        .map(move |i| if i >= count { i - count } else { i })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rotated_range_wraps() {
        assert_eq!(rotated_range(4, 2).collect::<Vec<_>>(), vec![2, 3, 0, 1]);
        assert_eq!(rotated_range(3, 0).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn interpolation_is_invertible() {
        let a = Interval::new(2.0, 6.0);
        assert_eq!(a.lerp(0.25), 3.0);
        assert_eq!(a.inv_lerp(3.0), 0.25);
        assert_eq!(a.length(), 4.0);
    }
}
