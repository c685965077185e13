pub use index::{LaneReservationIndex, UNREACHABLE};

use crate::intersection::Intersection;
use crate::math::{LineSegment2d, ParametricCurve2d, Point2d};
use crate::{LaneId, ManagerId, RoadId};
use cgmath::prelude::*;

mod index;

/// The length of the straight pieces a curved lane is decomposed into, in m.
const DECOMPOSITION_STEP: f64 = 1.0;

/// A lane is a single directed path segment which vehicles travel along.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// The geometry of the lane.
    kind: LaneKind,
    /// The part the lane plays in its road.
    role: LaneRole,
    /// The road the lane belongs to.
    road: Option<RoadId>,
    /// The total length of the lane in m.
    length: f64,
    /// Speed limit in m/s.
    speed_limit: f64,
    /// The width of the lane in m.
    width: f64,
    /// The lane that precedes this one.
    prev: Option<LaneId>,
    /// The lane that succeeds this one.
    next: Option<LaneId>,
    /// The intersection managers this lane feeds into.
    index: LaneReservationIndex,
}

/// The geometry of a lane.
#[derive(Clone, Debug)]
pub enum LaneKind {
    /// A single straight line.
    Straight(LineSegment2d),
    /// A curve, approximated by an ordered, contiguous chain of straight pieces.
    Curved { decomposition: Vec<LineSegment2d> },
}

/// The part a lane plays in a road passing through a roundabout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LaneRole {
    /// Leads from the edge of the map towards the intersection.
    Approach,
    /// Carries vehicles into the controlled region.
    Arrival,
    /// Joins the arrival lane onto the ring.
    MergeIn,
    /// A piece of the circulating carriageway.
    Ring,
    /// Leaves the ring towards the departure lane.
    MergeOut,
    /// Carries vehicles out of the controlled region.
    Departure,
    /// Leads from the intersection to the edge of the map.
    Exit,
}

/// The attributes of a lane.
pub struct LaneAttributes {
    /// The geometry of the lane's centre line.
    pub kind: LaneKind,
    /// The part the lane plays in its road.
    pub role: LaneRole,
    /// The speed limit in m/s.
    pub speed_limit: f64,
    /// The width of the lane in m.
    pub width: f64,
}

impl LaneKind {
    /// Decomposes a curve into a curved lane geometry.
    pub fn from_curve(curve: &impl ParametricCurve2d) -> Self {
        Self::Curved {
            decomposition: curve.decompose(DECOMPOSITION_STEP),
        }
    }

    /// The straight pieces making up the lane, in order of travel.
    pub fn segments(&self) -> &[LineSegment2d] {
        match self {
            LaneKind::Straight(segment) => std::slice::from_ref(segment),
            LaneKind::Curved { decomposition } => decomposition,
        }
    }
}

impl Lane {
    /// Creates a new lane.
    pub(crate) fn new(id: LaneId, attribs: LaneAttributes) -> Self {
        if let LaneKind::Curved { decomposition } = &attribs.kind {
            assert!(!decomposition.is_empty(), "Curved lane has no decomposition");
            debug_assert!(decomposition
                .windows(2)
                .all(|pair| pair[0].end().distance(pair[1].start()) < 1e-6));
        }
        let length = attribs.kind.segments().iter().map(|s| s.length()).sum();
        Self {
            id,
            kind: attribs.kind,
            role: attribs.role,
            road: None,
            length,
            speed_limit: attribs.speed_limit,
            width: attribs.width,
            prev: None,
            next: None,
            index: LaneReservationIndex::new(id),
        }
    }

    /// Gets the lane's ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Gets the geometry of the lane.
    pub fn kind(&self) -> &LaneKind {
        &self.kind
    }

    pub fn role(&self) -> LaneRole {
        self.role
    }

    /// The road this lane belongs to, if any.
    pub fn road(&self) -> Option<RoadId> {
        self.road
    }

    /// Gets the length of the lane in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Gets the speed limit of the lane in m/s.
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    /// Gets the width of the lane in m.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn prev(&self) -> Option<LaneId> {
        self.prev
    }

    pub fn next(&self) -> Option<LaneId> {
        self.next
    }

    /// The reservation index of this lane.
    pub fn index(&self) -> &LaneReservationIndex {
        &self.index
    }

    /// The straight pieces making up the lane, in order of travel.
    pub fn segments(&self) -> &[LineSegment2d] {
        self.kind.segments()
    }

    pub fn start_point(&self) -> Point2d {
        self.segments()[0].start()
    }

    pub fn end_point(&self) -> Point2d {
        self.segments()[self.segments().len() - 1].end()
    }

    pub fn start_heading(&self) -> f64 {
        self.segments()[0].heading()
    }

    pub fn end_heading(&self) -> f64 {
        self.segments()[self.segments().len() - 1].heading()
    }

    /// The point at the given distance along the lane, clamped to its ends.
    pub fn point_at(&self, distance: f64) -> Point2d {
        let (segment, offset) = self.segment_at(distance);
        segment.point_at(offset)
    }

    /// The heading of the lane at the given distance along it.
    pub fn heading_at(&self, distance: f64) -> f64 {
        self.segment_at(distance).0.heading()
    }

    /// The distance along the lane of the point on it closest to `point`.
    pub fn distance_along(&self, point: Point2d) -> f64 {
        match &self.kind {
            LaneKind::Straight(segment) => segment.project(point),
            LaneKind::Curved { decomposition } => {
                let mut travelled = 0.0;
                let mut best = (f64::INFINITY, 0.0);
                for segment in decomposition {
                    let along = segment.project(point);
                    let dist = point.distance(segment.point_at(along));
                    if dist < best.0 {
                        best = (dist, travelled + along);
                    }
                    travelled += segment.length();
                }
                best.1
            }
        }
    }

    /// The distance along the lane of `point`, as a fraction of the lane's
    /// length: 0 at the start, 1 at the end.
    pub fn normalized_distance_along(&self, point: Point2d) -> f64 {
        self.distance_along(point) / self.length
    }

    /// The distance from `point` to the end of the lane, measured along the lane.
    pub fn remaining_distance_along(&self, point: Point2d) -> f64 {
        self.length - self.distance_along(point)
    }

    /// Finds the segment containing the given distance along the lane,
    /// and the distance along that segment.
    pub(crate) fn segment_at(&self, distance: f64) -> (&LineSegment2d, f64) {
        let segments = self.segments();
        let mut remaining = f64::max(distance, 0.0);
        for segment in &segments[..segments.len() - 1] {
            if remaining < segment.length() {
                return (segment, remaining);
            }
            remaining -= segment.length();
        }
        (&segments[segments.len() - 1], remaining)
    }

    pub(crate) fn set_road(&mut self, road: RoadId) {
        self.road = Some(road);
    }

    pub(crate) fn set_prev(&mut self, lane: LaneId) {
        self.prev = Some(lane);
    }

    pub(crate) fn set_next(&mut self, lane: LaneId) {
        self.next = Some(lane);
    }

    /// Registers an intersection manager with this lane, if the lane is
    /// managed by the given intersection. Returns `true` if it was registered.
    pub(crate) fn register_manager(&mut self, manager: ManagerId, intersection: &Intersection) -> bool {
        if !intersection.manages(self.id) {
            return false;
        }
        let exit = intersection
            .exit_point(self.id)
            .unwrap_or_else(|| self.end_point());
        let normalized = self.normalized_distance_along(exit);
        self.index.insert(normalized, manager);
        true
    }

    pub(crate) fn invalidate_caches(&mut self) {
        self.index.invalidate();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Arc2d;
    use assert_approx_eq::assert_approx_eq;
    use slotmap::SlotMap;
    use std::f64::consts::PI;

    fn curved_lane() -> Lane {
        let mut ids = SlotMap::<LaneId, ()>::with_key();
        let arc = Arc2d::new(Point2d::new(0.0, 0.0), 10.0, 0.0, 0.5 * PI);
        Lane::new(
            ids.insert(()),
            LaneAttributes {
                kind: LaneKind::from_curve(&arc),
                role: LaneRole::Ring,
                speed_limit: 10.0,
                width: 4.0,
            },
        )
    }

    #[test]
    fn decomposition_preserves_endpoints_and_length() {
        let lane = curved_lane();
        let segments = lane.segments();
        assert_eq!(lane.start_point(), segments[0].start());
        assert_eq!(lane.end_point(), segments[segments.len() - 1].end());
        let total = segments.iter().map(|s| s.length()).sum::<f64>();
        assert_approx_eq!(lane.length(), total);
        // Chords are slightly shorter than the arc itself
        assert!(lane.length() < 5.0 * PI && lane.length() > 0.99 * 5.0 * PI);
    }

    #[test]
    fn projection_round_trips_along_curve() {
        let lane = curved_lane();
        for i in 0..10 {
            let distance = lane.length() * i as f64 / 10.0;
            let point = lane.point_at(distance);
            assert_approx_eq!(lane.distance_along(point), distance, 1e-6);
        }
        assert_approx_eq!(lane.normalized_distance_along(lane.end_point()), 1.0);
    }
}
