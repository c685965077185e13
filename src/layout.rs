//! A builder for a symmetric four-way roundabout with one lane per road.

use crate::lane::{LaneAttributes, LaneKind, LaneRole};
use crate::math::{heading, rot90, Arc2d, LineSegment2d, Point2d, QuadraticBezier2d, Vector2d};
use crate::road::RoadAttributes;
use crate::{LaneId, ManagerId, Network, RoadId};
use log::debug;
use std::f64::consts::FRAC_PI_2;

/// The names of the roads, in circulation order of the arms they enter from.
pub const ROAD_NAMES: [&str; 4] = ["Northbound", "Westbound", "Southbound", "Eastbound"];

/// The arms of the roundabout, as unit vectors pointing away from the centre,
/// in circulation order: south, east, north, west.
const ARMS: [(f64, f64); 4] = [(0.0, 1.0), (1.0, 0.0), (0.0, -1.0), (-1.0, 0.0)];

/// The parameters of a symmetric four-way roundabout.
///
/// Vehicles drive on the right and circulate anticlockwise as seen on screen.
/// Each road enters the ring from one arm and leaves it at the opposite arm.
#[derive(Clone, Debug)]
pub struct RoundaboutLayout {
    /// The centre of the ring.
    pub centre: Point2d,
    /// The radius of the ring's centre line, in m.
    pub ring_radius: f64,
    /// The width of every lane, in m.
    pub lane_width: f64,
    /// The length of the approach and exit lanes, in m.
    pub approach_length: f64,
    /// The length of the arrival and departure lanes, in m.
    pub arrival_length: f64,
    /// The speed limit outside the ring, in m/s.
    pub road_speed_limit: f64,
    /// The speed limit on the ring and its merge lanes, in m/s.
    pub ring_speed_limit: f64,
}

/// The handles of a roundabout built into a network.
#[derive(Clone, Copy, Debug)]
pub struct Roundabout {
    /// The manager controlling the roundabout.
    pub manager: ManagerId,
    /// The roads, in the same order as [ROAD_NAMES].
    pub roads: [RoadId; 4],
}

/// The lanes built for one arm of the roundabout.
struct Arm {
    approach: LaneId,
    arrival: LaneId,
    merge_in: LaneId,
    merge_out: LaneId,
    departure: LaneId,
    exit: LaneId,
}

impl Default for RoundaboutLayout {
    fn default() -> Self {
        Self {
            centre: Point2d::new(0.0, 0.0),
            ring_radius: 20.0,
            lane_width: 4.0,
            approach_length: 100.0,
            arrival_length: 20.0,
            road_speed_limit: 15.0,
            ring_speed_limit: 10.0,
        }
    }
}

impl RoundaboutLayout {
    /// The angle around the centre between an arm and the points where its
    /// merge lanes meet the ring.
    pub fn merge_angle(&self) -> f64 {
        (2.0 * self.lane_width / self.ring_radius).asin()
    }

    /// Builds the roundabout into the network and registers its manager.
    ///
    /// # Panics
    /// If the ring is too small for its lanes to merge onto it.
    pub fn build(&self, network: &mut Network) -> Roundabout {
        assert!(
            self.ring_radius >= 3.0 * self.lane_width,
            "Ring radius must be at least three lane widths"
        );
        assert!(self.approach_length > 0.0 && self.arrival_length > 0.0);

        let phi = self.merge_angle();
        let arms = ARMS.map(|(x, y)| self.build_arm(network, Vector2d::new(x, y)));

        // Long arcs run from an arm's merge in to the next arm's merge out,
        // short arcs link that merge out to the next arm's merge in. Each arm's
        // merge in chains onto its long arc and then its short arc.
        let radius = self.ring_radius;
        let ring = ARMS.map(|(x, y)| {
            let theta = heading(Vector2d::new(x, y));
            let long = Arc2d::new(self.centre, radius, theta - phi, -(FRAC_PI_2 - 2.0 * phi));
            let short = Arc2d::new(self.centre, radius, theta - FRAC_PI_2 + phi, -2.0 * phi);
            [
                self.add_lane(network, LaneKind::from_curve(&long), LaneRole::Ring),
                self.add_lane(network, LaneKind::from_curve(&short), LaneRole::Ring),
            ]
        });

        for (arm, [long, short]) in arms.iter().zip(ring) {
            network.connect_lanes(arm.merge_in, long);
            network.connect_lanes(long, short);
        }

        let roads = [0, 1, 2, 3].map(|i| {
            let (from, to) = (&arms[i], &arms[(i + 2) % 4]);
            network.add_road(&RoadAttributes {
                name: ROAD_NAMES[i],
                lanes: &[
                    from.approach,
                    from.arrival,
                    from.merge_in,
                    ring[i][0],
                    ring[i][1],
                    to.merge_out,
                    to.departure,
                    to.exit,
                ],
            })
        });
        network.set_dual(roads[0], roads[2]);
        network.set_dual(roads[1], roads[3]);

        let manager = network.add_intersection(&roads);
        debug!(
            "Built roundabout of radius {} at ({}, {})",
            self.ring_radius, self.centre.x, self.centre.y
        );
        Roundabout { manager, roads }
    }

    /// Builds the inbound and outbound lanes of an arm.
    fn build_arm(&self, network: &mut Network, arm: Vector2d) -> Arm {
        let (r, w) = (self.ring_radius, self.lane_width);
        let phi = self.merge_angle();
        let lat = rot90(-arm);
        let local = |x: f64, y: f64| self.centre + lat * x + arm * y;

        // Where the merge lanes' straight lines meet the ring's tangents
        let corner = r * phi.cos() + w * phi.tan();
        let mouth = corner + 2.0 * w;
        let outer = mouth + self.arrival_length;
        let edge = outer + self.approach_length;

        let merge_in = QuadraticBezier2d::new(&[
            local(w, mouth),
            local(w, corner),
            local(r * phi.sin(), r * phi.cos()),
        ]);
        let merge_out = QuadraticBezier2d::new(&[
            local(-r * phi.sin(), r * phi.cos()),
            local(-w, corner),
            local(-w, mouth),
        ]);

        let approach = LineSegment2d::from_ends(local(w, edge), local(w, outer));
        let arrival = LineSegment2d::from_ends(local(w, outer), local(w, mouth));
        let departure = LineSegment2d::from_ends(local(-w, mouth), local(-w, outer));
        let exit = LineSegment2d::from_ends(local(-w, outer), local(-w, edge));

        let arm = Arm {
            approach: self.add_lane(network, LaneKind::Straight(approach), LaneRole::Approach),
            arrival: self.add_lane(network, LaneKind::from_curve(&arrival), LaneRole::Arrival),
            merge_in: self.add_lane(network, LaneKind::from_curve(&merge_in), LaneRole::MergeIn),
            merge_out: self.add_lane(network, LaneKind::from_curve(&merge_out), LaneRole::MergeOut),
            departure: self.add_lane(
                network,
                LaneKind::from_curve(&departure),
                LaneRole::Departure,
            ),
            exit: self.add_lane(network, LaneKind::Straight(exit), LaneRole::Exit),
        };
        network.connect_lanes(arm.approach, arm.arrival);
        network.connect_lanes(arm.arrival, arm.merge_in);
        network.connect_lanes(arm.merge_out, arm.departure);
        network.connect_lanes(arm.departure, arm.exit);
        arm
    }

    fn add_lane(&self, network: &mut Network, kind: LaneKind, role: LaneRole) -> LaneId {
        let speed_limit = match role {
            LaneRole::MergeIn | LaneRole::Ring | LaneRole::MergeOut => self.ring_speed_limit,
            _ => self.road_speed_limit,
        };
        network.add_lane(LaneAttributes {
            kind,
            role,
            speed_limit,
            width: self.lane_width,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::MetricSpace;

    #[test]
    fn ring_lanes_join_merge_lanes() {
        let mut network = Network::new();
        let roundabout = RoundaboutLayout::default().build(&mut network);
        for road_id in roundabout.roads {
            let road = network.road(road_id);
            let lanes = road
                .lanes()
                .iter()
                .map(|id| network.lane(*id))
                .collect::<Vec<_>>();
            assert_eq!(lanes.len(), 8);
            // Arrival chain and ring are continuous
            for pair in lanes[..5].windows(2) {
                assert!(pair[0].end_point().distance(pair[1].start_point()) < 1e-6);
                assert_eq!(pair[0].next(), Some(pair[1].id()));
            }
            assert!(lanes[4].end_point().distance(lanes[5].start_point()) > 1.0);
            for pair in lanes[5..].windows(2) {
                assert!(pair[0].end_point().distance(pair[1].start_point()) < 1e-6);
            }
        }
    }

    #[test]
    fn roads_are_named_and_paired() {
        let mut network = Network::new();
        let roundabout = RoundaboutLayout::default().build(&mut network);
        let north = network.road_by_name("Northbound").unwrap();
        let south = network.road_by_name("Southbound").unwrap();
        assert_eq!(north.id(), roundabout.roads[0]);
        assert_eq!(north.dual(), Some(south.id()));
        assert_eq!(south.dual(), Some(north.id()));
    }
}
