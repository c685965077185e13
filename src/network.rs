use crate::intersection::Intersection;
use crate::lane::{Lane, LaneAttributes};
use crate::road::{Road, RoadAttributes};
use crate::{LaneId, LaneSet, ManagerId, RoadId, RoadSet};
use log::debug;
use slotmap::SlotMap;
use std::rc::Rc;

/// The road network: every lane, road and intersection known to the simulation.
///
/// Components which need to look up lanes or intersections are handed a
/// reference to the network explicitly.
#[derive(Default)]
pub struct Network {
    /// The lanes in the network.
    lanes: LaneSet,
    /// The roads in the network.
    roads: RoadSet,
    /// The controlled intersections, keyed by their manager.
    intersections: SlotMap<ManagerId, Rc<Intersection>>,
}

impl Network {
    /// Creates a new, empty network.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a lane to the network.
    pub fn add_lane(&mut self, attributes: LaneAttributes) -> LaneId {
        self.lanes.insert_with_key(|id| Lane::new(id, attributes))
    }

    /// Specifies that the end of the `from` lane connects to the start of the `to` lane.
    pub fn connect_lanes(&mut self, from: LaneId, to: LaneId) {
        self.lanes[from].set_next(to);
        self.lanes[to].set_prev(from);
    }

    /// Adds a road made up of existing lanes.
    pub fn add_road(&mut self, attributes: &RoadAttributes) -> RoadId {
        let road_id = self
            .roads
            .insert_with_key(|id| Road::new(id, attributes));
        for lane_id in attributes.lanes {
            self.lanes[*lane_id].set_road(road_id);
        }
        road_id
    }

    /// Specifies that two roads run in opposite directions.
    pub fn set_dual(&mut self, a: RoadId, b: RoadId) {
        self.roads[a].set_dual(b);
        self.roads[b].set_dual(a);
    }

    /// Builds the intersection where the given roads meet, and registers a
    /// new intersection manager with every lane it controls.
    pub fn add_intersection(&mut self, roads: &[RoadId]) -> ManagerId {
        let intersection = Rc::new(Intersection::new(self, roads));
        let manager = self.intersections.insert(intersection.clone());
        let registered = self
            .lanes
            .values_mut()
            .map(|lane| lane.register_manager(manager, &intersection))
            .filter(|registered| *registered)
            .count();
        self.invalidate_caches();
        debug!(
            "Registered manager {:?} with {} of {} lanes",
            manager,
            registered,
            self.lanes.len()
        );
        manager
    }

    /// Clears every lane's derived lookups.
    pub(crate) fn invalidate_caches(&mut self) {
        for lane in self.lanes.values_mut() {
            lane.invalidate_caches();
        }
    }

    /// Gets a reference to the lane with the given ID.
    pub fn lane(&self, lane_id: LaneId) -> &Lane {
        &self.lanes[lane_id]
    }

    pub(crate) fn lane_mut(&mut self, lane_id: LaneId) -> &mut Lane {
        &mut self.lanes[lane_id]
    }

    pub(crate) fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    /// The number of lanes in the network.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Gets a reference to the road with the given ID.
    pub fn road(&self, road_id: RoadId) -> &Road {
        &self.roads[road_id]
    }

    /// Finds a road by name.
    pub fn road_by_name(&self, name: &str) -> Option<&Road> {
        self.roads.values().find(|road| road.name() == name)
    }

    /// Gets the intersection controlled by the given manager.
    pub fn intersection(&self, manager: ManagerId) -> &Intersection {
        &self.intersections[manager]
    }

    /// Gets a shared handle to the intersection controlled by the given manager.
    pub fn shared_intersection(&self, manager: ManagerId) -> Rc<Intersection> {
        self.intersections[manager].clone()
    }

    /// Returns an iterator over all the lanes in the network.
    pub fn iter_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    /// Returns an iterator over all the roads in the network.
    pub fn iter_roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    /// Returns an iterator over all the intersection managers and their intersections.
    pub fn iter_intersections(&self) -> impl Iterator<Item = (ManagerId, &Intersection)> {
        self.intersections.iter().map(|(id, i)| (id, i.as_ref()))
    }
}
