use crate::intersection::{Intersection, TurnDirection};
use crate::lane::LaneRole;
use crate::math::Point2d;
use crate::util::rotated_range;
use crate::{LaneId, RoadId};
use cgmath::MetricSpace;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Ranks departure lanes and measures the paths through an intersection.
///
/// Results are memoised. The intersection's geometry never changes once
/// built, so the memos are never cleared.
pub struct TrackModel {
    intersection: Rc<Intersection>,
    /// Memoised departure lane rankings, by arrival lane and departure road.
    departures: RefCell<HashMap<(LaneId, RoadId), SmallVec<[LaneId; 2]>>>,
    /// Memoised traversal distances, by arrival and departure lane.
    distances: RefCell<HashMap<(LaneId, LaneId), f64>>,
}

/// The path a vehicle follows through an intersection, from the start of its
/// arrival lane to the end of its departure lane.
#[derive(Clone, Debug)]
pub struct Track {
    /// The lanes of the path, in order of travel.
    lanes: SmallVec<[LaneId; 8]>,
    /// The distance along the path of the entry point.
    entry: f64,
    /// The distance along the path of the exit point.
    exit: f64,
    /// The total length of the path.
    length: f64,
}

impl TrackModel {
    pub fn new(intersection: Rc<Intersection>) -> Self {
        Self {
            intersection,
            departures: RefCell::new(HashMap::new()),
            distances: RefCell::new(HashMap::new()),
        }
    }

    /// The intersection this track model describes.
    pub fn intersection(&self) -> &Intersection {
        &self.intersection
    }

    /// Gets the lanes of `departure_road` which exit the intersection,
    /// ordered by how close their exit point is to the arrival lane's entry point.
    pub fn sorted_departure_lanes(
        &self,
        arrival: LaneId,
        departure_road: RoadId,
    ) -> SmallVec<[LaneId; 2]> {
        if let Some(lanes) = self.departures.borrow().get(&(arrival, departure_road)) {
            return lanes.clone();
        }

        let intersection = &*self.intersection;
        let entry = intersection
            .entry_point(arrival)
            .expect("Arrival lane does not enter the intersection");
        let mut lanes = intersection
            .road(departure_road)
            .lanes()
            .iter()
            .filter_map(|id| intersection.exit_point(*id).map(|p| (*id, p.distance(entry))))
            .collect::<SmallVec<[(LaneId, f64); 2]>>();
        lanes.sort_by(|a, b| a.1.total_cmp(&b.1));
        let lanes = lanes.into_iter().map(|(id, _)| id).collect::<SmallVec<_>>();

        self.departures
            .borrow_mut()
            .insert((arrival, departure_road), lanes.clone());
        lanes
    }

    /// The length of the path from the start of the arrival lane to the end
    /// of the departure lane.
    pub fn traversal_distance(&self, arrival: LaneId, departure: LaneId) -> f64 {
        if let Some(dist) = self.distances.borrow().get(&(arrival, departure)) {
            return *dist;
        }
        let dist = self.track(arrival, departure).length;
        self.distances.borrow_mut().insert((arrival, departure), dist);
        dist
    }

    /// The traversal distance between two roads, taken from the arrival
    /// road's entering lane to the closest exiting lane of the departure road.
    pub fn road_traversal_distance(&self, arrival_road: RoadId, departure_road: RoadId) -> f64 {
        let arrival = self
            .intersection
            .road(arrival_road)
            .lanes()
            .iter()
            .copied()
            .find(|id| self.intersection.is_entered_by(*id))
            .expect("Arrival road does not enter the intersection");
        let departure = *self
            .sorted_departure_lanes(arrival, departure_road)
            .first()
            .expect("Departure road does not exit the intersection");
        self.traversal_distance(arrival, departure)
    }

    /// Gets the lanes travelled between an arrival lane and a departure lane:
    /// the arrival lane, the merge onto the ring, the ring lanes covering the
    /// turn, the merge off the ring and the departure lane.
    ///
    /// A right turn covers one quadrant of the ring, going straight two and a
    /// left turn three. A U-turn covers none.
    pub fn path(&self, arrival: LaneId, departure: LaneId) -> SmallVec<[LaneId; 8]> {
        let intersection = &*self.intersection;
        let arrival_road = intersection
            .road_of(arrival)
            .expect("Arrival lane does not belong to any road of this intersection");
        let departure_road = intersection
            .road_of(departure)
            .expect("Departure lane does not belong to any road of this intersection");

        let quadrants = match intersection.calc_turn_direction(arrival, departure) {
            TurnDirection::Right => 1,
            TurnDirection::Straight => 2,
            TurnDirection::Left => 3,
            TurnDirection::UTurn => 0,
        };

        let mut path = SmallVec::new();
        path.push(arrival);
        path.extend(self.lanes_with_role(arrival_road, LaneRole::MergeIn));
        if quadrants > 0 {
            let ring = intersection.ring_lanes();
            let first = self
                .lanes_with_role(arrival_road, LaneRole::Ring)
                .next()
                .and_then(|id| ring.iter().position(|r| *r == id))
                .expect("Arrival road has no ring lanes");
            path.extend(
                rotated_range(ring.len(), first)
                    .take(2 * quadrants - 1)
                    .map(|i| ring[i]),
            );
        }
        path.extend(self.lanes_with_role(departure_road, LaneRole::MergeOut));
        path.push(departure);
        path
    }

    /// Gets the path between an arrival lane and a departure lane, along with
    /// where it enters and leaves the controlled region.
    pub fn track(&self, arrival: LaneId, departure: LaneId) -> Track {
        let intersection = &*self.intersection;
        let lanes = self.path(arrival, departure);
        let length = lanes
            .iter()
            .map(|id| intersection.lane(*id).length())
            .sum::<f64>();
        let entry = intersection
            .entry_distance(arrival)
            .expect("Arrival lane does not enter the intersection");
        let departure_lane = intersection.lane(departure);
        let exit = length - departure_lane.length()
            + intersection
                .exit_distance(departure)
                .expect("Departure lane does not exit the intersection");
        Track {
            lanes,
            entry,
            exit,
            length,
        }
    }

    fn lanes_with_role(&self, road: RoadId, role: LaneRole) -> impl Iterator<Item = LaneId> + '_ {
        self.intersection
            .road(road)
            .lanes()
            .iter()
            .copied()
            .filter(move |id| self.intersection.lane(*id).role() == role)
    }
}

impl Track {
    /// The lanes of the path, in order of travel.
    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    /// The distance along the path of the entry point.
    pub fn entry(&self) -> f64 {
        self.entry
    }

    /// The distance along the path of the exit point.
    pub fn exit(&self) -> f64 {
        self.exit
    }

    /// The distance between the entry and exit points.
    pub fn internal_length(&self) -> f64 {
        self.exit - self.entry
    }

    /// The total length of the path.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The point at the given distance along the path, clamped to its ends.
    pub fn point_at(&self, intersection: &Intersection, distance: f64) -> Point2d {
        self.pose_at(intersection, distance).0
    }

    /// The point and heading at the given distance along the path, clamped to its ends.
    pub fn pose_at(&self, intersection: &Intersection, distance: f64) -> (Point2d, f64) {
        let mut remaining = f64::max(distance, 0.0);
        let (last, rest) = self.lanes.split_last().expect("Track has no lanes");
        let mut lane = intersection.lane(*last);
        for id in rest {
            let candidate = intersection.lane(*id);
            if remaining < candidate.length() {
                lane = candidate;
                break;
            }
            remaining -= candidate.length();
        }
        (lane.point_at(remaining), lane.heading_at(remaining))
    }
}
