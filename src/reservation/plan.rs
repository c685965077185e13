use super::grid::TileId;
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// A period of constant acceleration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelerationPhase {
    /// The acceleration in m/s^2.
    pub acceleration: f64,
    /// How long the phase lasts in s.
    pub duration: f64,
}

/// How a vehicle accelerates through the intersection: either a single
/// constant velocity phase, or an acceleration phase followed by one.
pub type AccelerationProfile = ArrayVec<AccelerationPhase, 2>;

/// The answer to a proposal: the tiles a vehicle would hold, and how it would
/// move through the intersection.
///
/// A plan is only binding once it has been accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    /// The tiles to hold, and the time steps to hold them for.
    pub(crate) tiles: Vec<(TileId, i64)>,
    pub(crate) exit_time: f64,
    pub(crate) exit_velocity: f64,
    pub(crate) acceleration_profile: AccelerationProfile,
}

impl Plan {
    /// The tiles to hold, and the time steps to hold them for.
    pub fn tiles(&self) -> &[(TileId, i64)] {
        &self.tiles
    }

    /// The time the front of the vehicle reaches the exit point, in s.
    pub fn exit_time(&self) -> f64 {
        self.exit_time
    }

    /// The velocity at the exit point, in m/s.
    pub fn exit_velocity(&self) -> f64 {
        self.exit_velocity
    }

    pub fn acceleration_profile(&self) -> &AccelerationProfile {
        &self.acceleration_profile
    }
}

/// The motion of a vehicle's front from the moment it arrives at the entry point.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Motion {
    velocity: f64,
    acceleration: f64,
    /// How long the vehicle accelerates for, in s.
    accelerating_for: f64,
}

impl Motion {
    /// Plans how a vehicle moves through the intersection.
    ///
    /// A vehicle arriving slower than the ideal speed accelerates up to it
    /// and then holds it. A vehicle arriving at or above the ideal speed holds
    /// the speed it arrived at.
    pub fn new(arrival_velocity: f64, ideal_velocity: f64, max_acceleration: f64) -> Self {
        if arrival_velocity < ideal_velocity && max_acceleration > 0.0 {
            Self {
                velocity: arrival_velocity,
                acceleration: max_acceleration,
                accelerating_for: (ideal_velocity - arrival_velocity) / max_acceleration,
            }
        } else {
            Self {
                velocity: arrival_velocity,
                acceleration: 0.0,
                accelerating_for: 0.0,
            }
        }
    }

    /// Returns false if the vehicle would never get anywhere.
    pub fn is_moving(&self) -> bool {
        self.velocity > 0.0 || self.acceleration > 0.0
    }

    /// The velocity once the acceleration phase is over.
    pub fn final_velocity(&self) -> f64 {
        self.velocity + self.acceleration * self.accelerating_for
    }

    /// The velocity `t` seconds after arriving.
    pub fn velocity_at(&self, t: f64) -> f64 {
        self.velocity + self.acceleration * t.clamp(0.0, self.accelerating_for)
    }

    /// The distance covered by the end of the acceleration phase.
    fn accelerating_distance(&self) -> f64 {
        let t = self.accelerating_for;
        self.velocity * t + 0.5 * self.acceleration * t * t
    }

    /// The distance travelled `t` seconds after arriving.
    pub fn distance_at(&self, t: f64) -> f64 {
        let t = f64::max(t, 0.0);
        if t <= self.accelerating_for {
            self.velocity * t + 0.5 * self.acceleration * t * t
        } else {
            self.accelerating_distance() + self.final_velocity() * (t - self.accelerating_for)
        }
    }

    /// The time after arriving at which the given distance has been travelled.
    pub fn time_to_travel(&self, distance: f64) -> f64 {
        let d1 = self.accelerating_distance();
        if distance <= d1 && self.acceleration > 0.0 {
            let (v, a) = (self.velocity, self.acceleration);
            (-v + (v * v + 2.0 * a * distance).sqrt()) / a
        } else {
            self.accelerating_for + (distance - d1) / self.final_velocity()
        }
    }

    /// The acceleration profile describing this motion until the given time after arriving.
    pub fn profile(&self, until: f64) -> AccelerationProfile {
        let mut profile = AccelerationProfile::new();
        let accelerating_for = f64::min(self.accelerating_for, until);
        if accelerating_for > 0.0 {
            profile.push(AccelerationPhase {
                acceleration: self.acceleration,
                duration: accelerating_for,
            });
        }
        profile.push(AccelerationPhase {
            acceleration: 0.0,
            duration: f64::max(until - accelerating_for, 0.0),
        });
        profile
    }
}
