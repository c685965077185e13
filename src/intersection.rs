use crate::lane::{Lane, LaneRole};
use crate::math::{angle_around, normalize_angle, ConvexPolygon, LineSegment2d, Point2d, Vector2d};
use crate::road::Road;
use crate::{Interval, LaneId, Network, RoadId};
use cgmath::prelude::*;
use itertools::Itertools;
use log::{debug, warn};
use slotmap::SparseSecondaryMap;
use smallvec::SmallVec;
use std::f64::consts::PI;

/// How far before an entry point, or after an exit point, the approach points lie, in m.
const APPROACH_DISTANCE: f64 = 1.0;

/// How much larger the enlarged copy of the controlled region is, in m.
const ENLARGE_BUFFER: f64 = 1.0;

/// The geometry of an intersection: the region it controls, and where and at
/// what heading every lane crosses into and out of that region.
///
/// Built once from the roads meeting at the intersection, and immutable afterwards.
#[derive(Clone, Debug)]
pub struct Intersection {
    /// The roads meeting at the intersection, in the order given.
    roads: SmallVec<[RoadId; 4]>,
    /// Copies of the roads meeting at the intersection.
    road_info: SparseSecondaryMap<RoadId, Road>,
    /// Copies of every lane of those roads, taken when the intersection was
    /// built. Only their geometry, role, road and speed limit are meaningful.
    lanes: SparseSecondaryMap<LaneId, Lane>,
    /// The controlled region, as a union of convex pieces.
    area: Vec<ConvexPolygon>,
    /// A slightly enlarged copy of the controlled region.
    enlarged_area: Vec<ConvexPolygon>,
    /// The centre of the intersection.
    centroid: Point2d,
    /// The largest circle around the centroid inside the circulating carriageway.
    min_circle: Circle,
    /// The smallest circle around the centroid enclosing the circulating carriageway.
    max_circle: Circle,
    /// Where each entering lane crosses into the region.
    entries: SparseSecondaryMap<LaneId, Crossing>,
    /// Where each exiting lane crosses out of the region.
    exits: SparseSecondaryMap<LaneId, Crossing>,
    /// Lanes which overlap the region at all.
    managed: SparseSecondaryMap<LaneId, ()>,
    /// Entry and exit points, ordered by angle around the centroid.
    crossing_points: Vec<(LaneId, Point2d)>,
    /// Approach points, ordered by angle around the centroid.
    approach_points: Vec<(LaneId, Point2d)>,
    /// The ring lanes in order of circulation.
    ring: Vec<LaneId>,
}

/// A circle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub centre: Point2d,
    pub radius: f64,
}

/// Where a lane crosses the boundary of the controlled region.
#[derive(Clone, Copy, Debug)]
struct Crossing {
    /// The distance along the lane of the crossing.
    distance: f64,
    point: Point2d,
    heading: f64,
    approach_point: Point2d,
    approach_heading: f64,
}

/// The classification of a movement through an intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurnDirection {
    Straight,
    Left,
    Right,
    UTurn,
}

impl Intersection {
    /// Builds the intersection where the given roads meet.
    ///
    /// The controlled region is the union of the merge and ring lanes of the
    /// roads, each widened to its lane width.
    pub(crate) fn new(network: &Network, roads: &[RoadId]) -> Self {
        assert!(!roads.is_empty(), "An intersection needs at least one road");

        let mut road_info = SparseSecondaryMap::new();
        let mut lanes = SparseSecondaryMap::new();
        for road_id in roads {
            let road = network.road(*road_id);
            for lane_id in road.lanes() {
                lanes.insert(*lane_id, network.lane(*lane_id).clone());
            }
            road_info.insert(*road_id, road.clone());
        }

        let internal = roads
            .iter()
            .flat_map(|id| road_info[*id].lanes().iter().copied())
            .filter(|id| {
                matches!(
                    lanes[*id].role(),
                    LaneRole::MergeIn | LaneRole::Ring | LaneRole::MergeOut
                )
            })
            .collect::<Vec<_>>();
        assert!(!internal.is_empty(), "Intersection has no internal lanes");

        let pieces = |buffer: f64| {
            internal
                .iter()
                .flat_map(|id| {
                    let lane = &lanes[*id];
                    let half_width = 0.5 * lane.width() + buffer;
                    lane.segments()
                        .iter()
                        .map(move |s| ConvexPolygon::from_segment(s, half_width, half_width))
                })
                .collect::<Vec<_>>()
        };
        let area = pieces(0.0);
        let enlarged_area = pieces(ENLARGE_BUFFER);

        let ring = Self::order_ring(&lanes, &internal);
        let (centroid, min_circle, max_circle) = Self::circles(&lanes, &ring, &area);

        let mut intersection = Self {
            roads: roads.iter().copied().collect(),
            road_info,
            lanes,
            area,
            enlarged_area,
            centroid,
            min_circle,
            max_circle,
            entries: SparseSecondaryMap::new(),
            exits: SparseSecondaryMap::new(),
            managed: SparseSecondaryMap::new(),
            crossing_points: vec![],
            approach_points: vec![],
            ring,
        };
        intersection.find_crossings();

        debug!(
            "Built intersection with {} roads, {} entries, {} exits, radii {:.2}..{:.2}",
            intersection.roads.len(),
            intersection.entries.len(),
            intersection.exits.len(),
            intersection.min_circle.radius,
            intersection.max_circle.radius
        );
        intersection
    }

    /// Orders the ring lanes by following them end to start.
    fn order_ring(lanes: &SparseSecondaryMap<LaneId, Lane>, internal: &[LaneId]) -> Vec<LaneId> {
        let ring = internal
            .iter()
            .copied()
            .filter(|id| lanes[*id].role() == LaneRole::Ring)
            .collect::<Vec<_>>();
        let Some(&first) = ring.first() else {
            return ring;
        };

        let mut ordered = vec![first];
        while ordered.len() < ring.len() {
            let end = lanes[ordered[ordered.len() - 1]].end_point();
            let next = ring
                .iter()
                .copied()
                .filter(|id| !ordered.contains(id))
                .min_by(|a, b| {
                    let da = lanes[*a].start_point().distance(end);
                    let db = lanes[*b].start_point().distance(end);
                    da.total_cmp(&db)
                })
                .expect("Ring lanes exhausted");
            ordered.push(next);
        }
        ordered
    }

    /// Computes the centroid and the minimal and maximal circles.
    fn circles(
        lanes: &SparseSecondaryMap<LaneId, Lane>,
        ring: &[LaneId],
        area: &[ConvexPolygon],
    ) -> (Point2d, Circle, Circle) {
        if ring.is_empty() {
            warn!("Intersection has no ring lanes; using the centre of its region");
            let vertices = area.iter().flat_map(|p| p.vertices()).collect::<Vec<_>>();
            let sum = vertices
                .iter()
                .fold(Vector2d::zero(), |acc, p| acc + p.to_vec());
            let centroid = Point2d::from_vec(sum / vertices.len() as f64);
            let radius = vertices
                .iter()
                .map(|p| p.distance(centroid))
                .fold(0.0, f64::max);
            let min = Circle { centre: centroid, radius: 0.0 };
            let max = Circle { centre: centroid, radius };
            return (centroid, min, max);
        }

        // Every vertex of a ring lane's decomposition lies on the same circle,
        // while points partway along a chord lie inside it
        let centres = ring
            .iter()
            .map(|id| {
                let lane = &lanes[*id];
                let segments = lane.segments();
                let mid = segments[segments.len() / 2].start();
                circumcentre(lane.start_point(), mid, lane.end_point())
                    .expect("Ring lane is not curved")
            })
            .collect::<Vec<_>>();
        let centroid = centres[0];
        for centre in &centres[1..] {
            assert!(
                centre.distance(centroid) < 1e-3,
                "Ring lanes do not share a common origin"
            );
        }

        let segments = ring.iter().flat_map(|id| {
            let lane = &lanes[*id];
            lane.segments().iter().map(move |s| (s, 0.5 * lane.width()))
        });
        let (mut inner, mut outer) = (f64::INFINITY, 0.0);
        for (segment, half_width) in segments {
            inner = f64::min(inner, segment.distance_to(centroid) - half_width);
            outer = f64::max(outer, segment.start().distance(centroid) + half_width);
            outer = f64::max(outer, segment.end().distance(centroid) + half_width);
        }
        let min = Circle { centre: centroid, radius: f64::max(inner, 0.0) };
        let max = Circle { centre: centroid, radius: outer };
        (centroid, min, max)
    }

    /// Finds where each lane crosses into and out of the controlled region.
    fn find_crossings(&mut self) {
        let found = self
            .lanes
            .iter()
            .map(|(id, lane)| {
                let managed = lane.segments().iter().any(|s| self.clip(s).is_some());
                (id, managed, self.find_entry(lane), self.find_exit(lane))
            })
            .collect::<Vec<_>>();
        for (lane_id, managed, entry, exit) in found {
            if managed {
                self.managed.insert(lane_id, ());
            }
            if let Some(entry) = entry {
                self.entries.insert(lane_id, entry);
            }
            if let Some(exit) = exit {
                self.exits.insert(lane_id, exit);
            }
        }

        let by_angle = |points: Vec<(LaneId, Point2d)>| {
            points
                .into_iter()
                .sorted_by(|a, b| {
                    angle_around(self.centroid, a.1).total_cmp(&angle_around(self.centroid, b.1))
                })
                .collect::<Vec<_>>()
        };
        let crossings = self
            .entries
            .iter()
            .chain(self.exits.iter())
            .collect::<Vec<_>>();
        let crossing_points = by_angle(crossings.iter().map(|(id, c)| (*id, c.point)).collect());
        let approach_points =
            by_angle(crossings.iter().map(|(id, c)| (*id, c.approach_point)).collect());
        self.crossing_points = crossing_points;
        self.approach_points = approach_points;
    }

    /// The first point along the lane inside the region, if the lane starts outside it.
    fn find_entry(&self, lane: &Lane) -> Option<Crossing> {
        if self.contains(lane.start_point()) {
            return None;
        }
        let mut travelled = 0.0;
        for segment in lane.segments() {
            if let Some(range) = self.clip(segment) {
                let distance = travelled + range.min * segment.length();
                let approach = f64::max(distance - APPROACH_DISTANCE, 0.0);
                return Some(Crossing {
                    distance,
                    point: segment.point_at(range.min * segment.length()),
                    heading: segment.heading(),
                    approach_point: lane.point_at(approach),
                    approach_heading: lane.heading_at(approach),
                });
            }
            travelled += segment.length();
        }
        None
    }

    /// The last point along the lane inside the region, if the lane ends outside it.
    fn find_exit(&self, lane: &Lane) -> Option<Crossing> {
        if self.contains(lane.end_point()) {
            return None;
        }
        let mut remaining = lane.length();
        for segment in lane.segments().iter().rev() {
            remaining -= segment.length();
            if let Some(range) = self.clip(segment) {
                let distance = remaining + range.max * segment.length();
                let approach = f64::min(distance + APPROACH_DISTANCE, lane.length());
                return Some(Crossing {
                    distance,
                    point: segment.point_at(range.max * segment.length()),
                    heading: segment.heading(),
                    approach_point: lane.point_at(approach),
                    approach_heading: lane.heading_at(approach),
                });
            }
        }
        None
    }

    /// Clips a segment against the union of the region's pieces, returning the
    /// range of its parameter between the first entry and last exit.
    fn clip(&self, segment: &LineSegment2d) -> Option<Interval<f64>> {
        self.area
            .iter()
            .filter_map(|piece| piece.clip(segment))
            .reduce(|a, b| Interval::new(f64::min(a.min, b.min), f64::max(a.max, b.max)))
    }

    /// Returns true if the point lies inside the controlled region.
    pub fn contains(&self, point: Point2d) -> bool {
        self.area.iter().any(|piece| piece.contains(point))
    }

    /// Returns true if the point lies inside the enlarged controlled region.
    pub fn enlarged_contains(&self, point: Point2d) -> bool {
        self.enlarged_area.iter().any(|piece| piece.contains(point))
    }

    /// The controlled region, as a union of convex pieces.
    pub fn area(&self) -> &[ConvexPolygon] {
        &self.area
    }

    /// The enlarged controlled region, as a union of convex pieces.
    pub fn enlarged_area(&self) -> &[ConvexPolygon] {
        &self.enlarged_area
    }

    pub fn centroid(&self) -> Point2d {
        self.centroid
    }

    pub fn min_circle(&self) -> Circle {
        self.min_circle
    }

    pub fn max_circle(&self) -> Circle {
        self.max_circle
    }

    /// The roads meeting at the intersection.
    pub fn roads(&self) -> &[RoadId] {
        &self.roads
    }

    /// Gets the intersection's copy of a road.
    pub fn road(&self, road: RoadId) -> &Road {
        self.road_info
            .get(road)
            .expect("Road does not meet at this intersection")
    }

    /// Gets the intersection's copy of a lane.
    ///
    /// The copy is for geometry only. Its reservation index is empty, and its
    /// links are those of the lane when the intersection was built; look the
    /// lane up in the [Network] for either.
    pub fn lane(&self, lane: LaneId) -> &Lane {
        self.lanes
            .get(lane)
            .expect("Lane does not belong to any road of this intersection")
    }

    /// Every lane of the roads meeting at the intersection.
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    /// The ring lanes, in order of circulation.
    pub fn ring_lanes(&self) -> &[LaneId] {
        &self.ring
    }

    /// The road a lane belongs to, if it is one of the intersection's roads.
    pub fn road_of(&self, lane: LaneId) -> Option<RoadId> {
        self.lanes.get(lane).and_then(|lane| lane.road())
    }

    /// Returns true if the lane overlaps the controlled region.
    pub fn manages(&self, lane: LaneId) -> bool {
        self.managed.contains_key(lane)
    }

    /// Returns true if the lane crosses into the controlled region.
    pub fn is_entered_by(&self, lane: LaneId) -> bool {
        self.entries.contains_key(lane)
    }

    /// Returns true if the lane crosses out of the controlled region.
    pub fn is_exited_by(&self, lane: LaneId) -> bool {
        self.exits.contains_key(lane)
    }

    pub fn entry_point(&self, lane: LaneId) -> Option<Point2d> {
        self.entries.get(lane).map(|c| c.point)
    }

    pub fn entry_heading(&self, lane: LaneId) -> Option<f64> {
        self.entries.get(lane).map(|c| c.heading)
    }

    /// The distance along the lane of its entry point.
    pub fn entry_distance(&self, lane: LaneId) -> Option<f64> {
        self.entries.get(lane).map(|c| c.distance)
    }

    pub fn exit_point(&self, lane: LaneId) -> Option<Point2d> {
        self.exits.get(lane).map(|c| c.point)
    }

    pub fn exit_heading(&self, lane: LaneId) -> Option<f64> {
        self.exits.get(lane).map(|c| c.heading)
    }

    /// The distance along the lane of its exit point.
    pub fn exit_distance(&self, lane: LaneId) -> Option<f64> {
        self.exits.get(lane).map(|c| c.distance)
    }

    pub fn approach_entry_point(&self, lane: LaneId) -> Option<Point2d> {
        self.entries.get(lane).map(|c| c.approach_point)
    }

    pub fn approach_entry_heading(&self, lane: LaneId) -> Option<f64> {
        self.entries.get(lane).map(|c| c.approach_heading)
    }

    pub fn approach_exit_point(&self, lane: LaneId) -> Option<Point2d> {
        self.exits.get(lane).map(|c| c.approach_point)
    }

    pub fn approach_exit_heading(&self, lane: LaneId) -> Option<f64> {
        self.exits.get(lane).map(|c| c.approach_heading)
    }

    /// All entry and exit points, ordered by angle around the centroid.
    pub fn entry_exit_points(&self) -> &[(LaneId, Point2d)] {
        &self.crossing_points
    }

    /// All approach points, ordered by angle around the centroid.
    pub fn approach_points(&self) -> &[(LaneId, Point2d)] {
        &self.approach_points
    }

    /// Classifies the movement from an arrival lane to a departure lane.
    ///
    /// # Panics
    /// If either lane does not belong to one of the intersection's roads,
    /// or if they belong to different roads and the arrival lane does not
    /// enter, or the departure lane does not exit, the region.
    pub fn calc_turn_direction(&self, arrival: LaneId, departure: LaneId) -> TurnDirection {
        let arrival_road = self
            .road_of(arrival)
            .expect("Arrival lane does not belong to any road of this intersection");
        let departure_road = self
            .road_of(departure)
            .expect("Departure lane does not belong to any road of this intersection");

        if arrival_road == departure_road {
            return TurnDirection::Straight;
        }
        if self.road(arrival_road).dual() == Some(departure_road) {
            return TurnDirection::UTurn;
        }

        let entry = self
            .entry_heading(arrival)
            .expect("Arrival lane does not enter the intersection");
        let exit = self
            .exit_heading(departure)
            .expect("Departure lane does not exit the intersection");
        let delta = normalize_angle(exit - entry);
        if delta == 0.0 {
            TurnDirection::Straight
        } else if delta < PI {
            TurnDirection::Right
        } else if delta > PI {
            TurnDirection::Left
        } else {
            // Pretty unlikely for two different roads, but possible
            TurnDirection::UTurn
        }
    }
}

/// The centre of the circle passing through three points.
fn circumcentre(a: Point2d, b: Point2d, c: Point2d) -> Option<Point2d> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-9 {
        return None;
    }
    let (a2, b2, c2) = (a.to_vec().magnitude2(), b.to_vec().magnitude2(), c.to_vec().magnitude2());
    let x = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let y = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    Some(Point2d::new(x, y))
}
