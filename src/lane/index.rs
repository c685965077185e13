use crate::math::Point2d;
use crate::{LaneId, ManagerId, Network};
use once_cell::unsync::OnceCell;
use smallvec::SmallVec;

/// The distance reported when no intersection can be reached.
pub const UNREACHABLE: f64 = f64::MAX;

/// Records which intersection managers a lane feeds into, keyed by the
/// normalized distance along the lane (0 at the start, 1 at the end) at
/// which the lane leaves each manager's controlled region.
///
/// Queries that cannot be answered from this lane alone follow the lane's
/// predecessor or successor links through the [Network].
#[derive(Clone, Debug)]
pub struct LaneReservationIndex {
    /// The lane this index belongs to.
    lane: LaneId,
    /// The managers, ordered by normalized exit distance.
    managers: SmallVec<[(f64, ManagerId); 2]>,
    /// The first distinct managers found on the lanes after this one.
    downstream: OnceCell<SmallVec<[ManagerId; 2]>>,
}

impl LaneReservationIndex {
    pub(crate) fn new(lane: LaneId) -> Self {
        Self {
            lane,
            managers: SmallVec::new(),
            downstream: OnceCell::new(),
        }
    }

    /// Records that the lane leaves `manager`'s region at the given normalized distance.
    pub(crate) fn insert(&mut self, normalized: f64, manager: ManagerId) {
        self.managers.retain(|(_, id)| *id != manager);
        let idx = self
            .managers
            .iter()
            .position(|(key, _)| *key > normalized)
            .unwrap_or(self.managers.len());
        self.managers.insert(idx, (normalized, manager));
        self.invalidate();
    }

    /// Clears any cached lookups.
    pub(crate) fn invalidate(&mut self) {
        self.downstream = OnceCell::new();
    }

    /// Returns true if no manager is registered with this lane.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// The registered managers and their normalized exit distances, in order.
    pub fn managers(&self) -> impl Iterator<Item = (f64, ManagerId)> + '_ {
        self.managers.iter().copied()
    }

    /// Returns true if the given manager is registered with this lane.
    pub fn contains(&self, manager: ManagerId) -> bool {
        self.managers.iter().any(|(_, id)| *id == manager)
    }

    /// The manager at the smallest recorded distance along the lane.
    pub fn first_intersection_manager(&self) -> Option<ManagerId> {
        self.managers.first().map(|(_, id)| *id)
    }

    /// The manager at the largest recorded distance along the lane.
    pub fn last_intersection_manager(&self) -> Option<ManagerId> {
        self.managers.last().map(|(_, id)| *id)
    }

    /// The first manager whose region has not yet been left at the given normalized distance.
    pub fn next_intersection_manager(&self, normalized: f64) -> Option<ManagerId> {
        self.managers
            .iter()
            .find(|(key, _)| *key > normalized)
            .map(|(_, id)| *id)
    }

    /// The last manager whose region has been left at the given normalized distance.
    pub fn prev_intersection_manager(&self, normalized: f64) -> Option<ManagerId> {
        self.managers
            .iter()
            .rev()
            .find(|(key, _)| *key <= normalized)
            .map(|(_, id)| *id)
    }

    /// The distance from the start of this lane to the first controlled region
    /// ahead, following successor lanes as needed.
    ///
    /// Returns 0 if the lane starts inside the region, or [UNREACHABLE] if no
    /// region can be reached along the chain.
    pub fn distance_to_first_intersection(&self, network: &Network) -> f64 {
        let mut travelled = 0.0;
        let mut lane = network.lane(self.lane);
        for _ in 0..network.lane_count() {
            if let Some(manager) = lane.index().first_intersection_manager() {
                let dist = lane.index().distance_into(network, manager);
                return if dist == UNREACHABLE { UNREACHABLE } else { travelled + dist };
            }
            travelled += lane.length();
            match lane.next() {
                Some(next) => lane = network.lane(next),
                None => return UNREACHABLE,
            }
        }
        UNREACHABLE
    }

    /// The distance from the last controlled region behind to the end of this
    /// lane, following predecessor lanes as needed.
    ///
    /// Returns 0 if the lane ends inside the region, or [UNREACHABLE] if no
    /// region lies behind along the chain.
    pub fn remaining_distance_from_last_intersection(&self, network: &Network) -> f64 {
        let mut travelled = 0.0;
        let mut lane = network.lane(self.lane);
        for _ in 0..network.lane_count() {
            if let Some(manager) = lane.index().last_intersection_manager() {
                let dist = lane.index().distance_out_of(network, manager);
                return if dist == UNREACHABLE { UNREACHABLE } else { travelled + dist };
            }
            travelled += lane.length();
            match lane.prev() {
                Some(prev) => lane = network.lane(prev),
                None => return UNREACHABLE,
            }
        }
        UNREACHABLE
    }

    /// The distance from `point` to the next controlled region along the lane.
    pub fn distance_to_next_intersection(&self, network: &Network, point: Point2d) -> f64 {
        let lane = network.lane(self.lane);
        let along = lane.distance_along(point);
        match self.next_intersection_manager(along / lane.length()) {
            Some(manager) => match network.intersection(manager).entry_point(self.lane) {
                // Buffers and rounding may place us slightly past the entry point
                Some(entry) => f64::max(lane.distance_along(entry) - along, 0.0),
                None => 0.0,
            },
            None => {
                let rest = match lane.next() {
                    Some(next) => network.lane(next).index().distance_to_first_intersection(network),
                    None => UNREACHABLE,
                };
                if rest == UNREACHABLE {
                    UNREACHABLE
                } else {
                    f64::max(lane.length() - along + rest, 0.0)
                }
            }
        }
    }

    /// The distance from the previous controlled region along the lane to `point`.
    pub fn distance_from_prev_intersection(&self, network: &Network, point: Point2d) -> f64 {
        let lane = network.lane(self.lane);
        let along = lane.distance_along(point);
        match self.prev_intersection_manager(along / lane.length()) {
            Some(manager) => match network.intersection(manager).exit_point(self.lane) {
                Some(exit) => f64::max(along - lane.distance_along(exit), 0.0),
                None => 0.0,
            },
            None => {
                let rest = match lane.prev() {
                    Some(prev) => network
                        .lane(prev)
                        .index()
                        .remaining_distance_from_last_intersection(network),
                    None => UNREACHABLE,
                };
                if rest == UNREACHABLE {
                    UNREACHABLE
                } else {
                    f64::max(along + rest, 0.0)
                }
            }
        }
    }

    /// The manager a vehicle reaches after leaving `from`, if any.
    pub fn subsequent_manager(&self, network: &Network, from: ManagerId) -> Option<ManagerId> {
        let on_lane = match self.managers.iter().position(|(_, id)| *id == from) {
            Some(idx) => self.managers.get(idx + 1).map(|(_, id)| *id),
            None => self.first_intersection_manager(),
        };
        on_lane.or_else(|| {
            self.downstream_managers(network)
                .iter()
                .copied()
                .find(|id| *id != from)
        })
    }

    /// The time it takes to travel from this lane to the manager after `from`,
    /// driving at the lower of each lane's speed limit and `max_velocity`.
    ///
    /// Only a single intersection along a chain is supported; if there is no
    /// subsequent manager this returns 0.
    pub fn time_to_next_intersection_manager(
        &self,
        network: &Network,
        from: ManagerId,
        max_velocity: f64,
    ) -> f64 {
        let Some(target) = self.subsequent_manager(network, from) else {
            return 0.0;
        };
        let mut time = 0.0;
        let mut lane = network.lane(self.lane);
        for _ in 0..network.lane_count() {
            if lane.index().contains(target) {
                break;
            }
            time += lane.length() / f64::min(lane.speed_limit(), max_velocity);
            match lane.next() {
                Some(next) => lane = network.lane(next),
                None => break,
            }
        }
        time
    }

    /// Walks forward from this lane, returning the distance from the start of
    /// this lane to the region's entry point, or 0 if the walk starts inside
    /// the region.
    fn distance_into(&self, network: &Network, manager: ManagerId) -> f64 {
        let intersection = network.intersection(manager);
        let mut travelled = 0.0;
        let mut lane = network.lane(self.lane);
        for _ in 0..network.lane_count() {
            match intersection.entry_point(lane.id()) {
                Some(entry) => return travelled + lane.distance_along(entry),
                // Starts inside the region, and has not left it yet
                None if intersection.manages(lane.id()) => return 0.0,
                None => {
                    travelled += lane.length();
                    match lane.next() {
                        Some(next) => lane = network.lane(next),
                        // Passed the intersection on a different branch
                        None => return UNREACHABLE,
                    }
                }
            }
        }
        UNREACHABLE
    }

    /// Walks backward from this lane, returning the distance from the region's
    /// exit point to the end of this lane.
    fn distance_out_of(&self, network: &Network, manager: ManagerId) -> f64 {
        let intersection = network.intersection(manager);
        let mut travelled = 0.0;
        let mut lane = network.lane(self.lane);
        for _ in 0..network.lane_count() {
            match intersection.exit_point(lane.id()) {
                Some(exit) => return travelled + lane.remaining_distance_along(exit),
                // Ends inside the region
                None if intersection.manages(lane.id()) => return 0.0,
                None => {
                    travelled += lane.length();
                    match lane.prev() {
                        Some(prev) => lane = network.lane(prev),
                        None => return UNREACHABLE,
                    }
                }
            }
        }
        UNREACHABLE
    }

    /// The first two distinct managers registered on the lanes after this one.
    fn downstream_managers(&self, network: &Network) -> &[ManagerId] {
        self.downstream.get_or_init(|| {
            let mut found = SmallVec::<[ManagerId; 2]>::new();
            let mut next = network.lane(self.lane).next();
            let mut steps = 0;
            while let Some(id) = next {
                let lane = network.lane(id);
                for (_, manager) in lane.index().managers() {
                    if !found.contains(&manager) {
                        found.push(manager);
                    }
                }
                steps += 1;
                if found.len() >= 2 || steps >= network.lane_count() {
                    break;
                }
                next = lane.next();
            }
            found
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lane::{LaneAttributes, LaneKind, LaneRole};
    use crate::math::LineSegment2d;
    use assert_approx_eq::assert_approx_eq;
    use slotmap::SlotMap;

    fn straight(network: &mut Network, x0: f64, x1: f64, speed_limit: f64) -> LaneId {
        network.add_lane(LaneAttributes {
            kind: LaneKind::Straight(LineSegment2d::from_ends(
                Point2d::new(x0, 0.0),
                Point2d::new(x1, 0.0),
            )),
            role: LaneRole::Approach,
            speed_limit,
            width: 3.0,
        })
    }

    fn manager_ids(n: usize) -> Vec<ManagerId> {
        let mut ids = SlotMap::<ManagerId, ()>::with_key();
        (0..n).map(|_| ids.insert(())).collect()
    }

    #[test]
    fn managers_are_ordered_by_distance() {
        let mut network = Network::new();
        let lane = straight(&mut network, 0.0, 10.0, 10.0);
        let ids = manager_ids(2);
        network.lane_mut(lane).index.insert(0.8, ids[0]);
        network.lane_mut(lane).index.insert(0.3, ids[1]);

        let index = network.lane(lane).index();
        assert_eq!(index.first_intersection_manager(), Some(ids[1]));
        assert_eq!(index.last_intersection_manager(), Some(ids[0]));
        assert_eq!(index.next_intersection_manager(0.5), Some(ids[0]));
        assert_eq!(index.prev_intersection_manager(0.5), Some(ids[1]));
        assert_eq!(index.next_intersection_manager(0.9), None);
    }

    #[test]
    fn unregistered_chain_is_unreachable() {
        let mut network = Network::new();
        let a = straight(&mut network, 0.0, 10.0, 10.0);
        let b = straight(&mut network, 10.0, 20.0, 10.0);
        network.connect_lanes(a, b);

        let index = network.lane(a).index();
        assert_eq!(index.distance_to_first_intersection(&network), UNREACHABLE);
        assert_eq!(
            network.lane(b).index().remaining_distance_from_last_intersection(&network),
            UNREACHABLE
        );
        assert_eq!(
            index.distance_to_next_intersection(&network, Point2d::new(5.0, 0.0)),
            UNREACHABLE
        );
    }

    #[test]
    fn time_to_next_manager_sums_intervening_lanes() {
        let mut network = Network::new();
        let a = straight(&mut network, 0.0, 100.0, 20.0);
        let b = straight(&mut network, 100.0, 200.0, 10.0);
        let c = straight(&mut network, 200.0, 300.0, 20.0);
        network.connect_lanes(a, b);
        network.connect_lanes(b, c);
        let ids = manager_ids(2);
        network.lane_mut(a).index.insert(0.5, ids[0]);
        network.lane_mut(c).index.insert(0.5, ids[1]);

        let index = network.lane(a).index();
        assert_eq!(index.subsequent_manager(&network, ids[0]), Some(ids[1]));
        // 100 m at 15 m/s, then 100 m at 10 m/s
        assert_approx_eq!(
            index.time_to_next_intersection_manager(&network, ids[0], 15.0),
            100.0 / 15.0 + 100.0 / 10.0
        );
        // Nothing follows the last manager
        let last = network.lane(c).index();
        assert_eq!(last.subsequent_manager(&network, ids[1]), None);
        assert_eq!(last.time_to_next_intersection_manager(&network, ids[1], 15.0), 0.0);
    }

    #[test]
    fn registration_invalidates_cached_lookups() {
        let mut network = Network::new();
        let a = straight(&mut network, 0.0, 10.0, 10.0);
        let b = straight(&mut network, 10.0, 20.0, 10.0);
        network.connect_lanes(a, b);
        let ids = manager_ids(2);
        network.lane_mut(a).index.insert(0.5, ids[0]);
        assert_eq!(network.lane(a).index().subsequent_manager(&network, ids[0]), None);

        network.lane_mut(b).index.insert(0.5, ids[1]);
        network.invalidate_caches();
        assert_eq!(
            network.lane(a).index().subsequent_manager(&network, ids[0]),
            Some(ids[1])
        );
    }
}
