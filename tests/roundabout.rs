//! Tests of the geometry and track model of the standard four-way roundabout.

use assert_approx_eq::assert_approx_eq;
use roundabout_aim::cgmath::MetricSpace;
use roundabout_aim::layout::{Roundabout, ROAD_NAMES};
use roundabout_aim::{LaneId, LaneRole, Network, RoadId, RoundaboutLayout, TrackModel, TurnDirection};

fn build() -> (Network, Roundabout) {
    let mut network = Network::new();
    let roundabout = RoundaboutLayout::default().build(&mut network);
    (network, roundabout)
}

fn lane_with_role(network: &Network, road: RoadId, role: LaneRole) -> LaneId {
    network
        .road(road)
        .lanes()
        .iter()
        .copied()
        .find(|id| network.lane(*id).role() == role)
        .unwrap()
}

fn arrival(network: &Network, road: RoadId) -> LaneId {
    lane_with_role(network, road, LaneRole::Arrival)
}

fn departure(network: &Network, road: RoadId) -> LaneId {
    lane_with_role(network, road, LaneRole::Departure)
}

/// Test that every lane which crosses into or out of the region has a crossing point.
#[test]
fn crossing_lanes_have_points() {
    let (network, roundabout) = build();
    let intersection = network.intersection(roundabout.manager);
    for lane in network.iter_lanes() {
        let id = lane.id();
        assert_eq!(intersection.is_entered_by(id), intersection.entry_point(id).is_some());
        assert_eq!(intersection.is_exited_by(id), intersection.exit_point(id).is_some());
        assert_eq!(
            intersection.is_entered_by(id),
            intersection.approach_entry_point(id).is_some()
        );

        match lane.role() {
            LaneRole::Arrival => assert!(intersection.is_entered_by(id) && !intersection.is_exited_by(id)),
            LaneRole::Departure => assert!(intersection.is_exited_by(id) && !intersection.is_entered_by(id)),
            LaneRole::Approach | LaneRole::Exit => assert!(!intersection.manages(id)),
            LaneRole::MergeIn | LaneRole::Ring | LaneRole::MergeOut => {
                assert!(intersection.manages(id));
                assert!(!intersection.is_entered_by(id) && !intersection.is_exited_by(id));
            }
        }
    }
}

/// Test that crossing headings match the sub-segments either side of the crossing.
#[test]
fn crossing_headings_follow_sub_segments() {
    let (network, roundabout) = build();
    let intersection = network.intersection(roundabout.manager);
    for road in roundabout.roads {
        let arrival = network.lane(arrival(&network, road));
        let distance = intersection.entry_distance(arrival.id()).unwrap();
        assert_approx_eq!(
            intersection.entry_heading(arrival.id()).unwrap(),
            arrival.heading_at(distance + 1e-6)
        );
        let entry = intersection.entry_point(arrival.id()).unwrap();
        assert!(entry.distance(arrival.point_at(distance)) < 1e-6);
        // The region extends half a lane width beyond the merge lane
        assert_approx_eq!(arrival.length() - distance, 2.0, 1e-2);

        let departure = network.lane(departure(&network, road));
        let distance = intersection.exit_distance(departure.id()).unwrap();
        assert_approx_eq!(
            intersection.exit_heading(departure.id()).unwrap(),
            departure.heading_at(distance - 1e-6)
        );
    }
}

/// Test that the circles bound the ring and that crossings are ordered around the centroid.
#[test]
fn circles_and_ordering() {
    let (network, roundabout) = build();
    let intersection = network.intersection(roundabout.manager);
    let centroid = intersection.centroid();
    assert!(centroid.x.abs() < 1e-6 && centroid.y.abs() < 1e-6);
    assert!(intersection.min_circle().radius < 18.0 && intersection.min_circle().radius > 17.9);
    assert_approx_eq!(intersection.max_circle().radius, 22.0, 1e-6);
    assert_eq!(intersection.ring_lanes().len(), 8);
    assert_eq!(intersection.entry_exit_points().len(), 8);
    assert_eq!(intersection.approach_points().len(), 8);

    let angles = intersection
        .entry_exit_points()
        .iter()
        .map(|(_, p)| roundabout_aim::math::angle_around(centroid, *p))
        .collect::<Vec<_>>();
    assert!(angles.windows(2).all(|pair| pair[0] <= pair[1]));
}

/// Test the turn classification between every pair of roads.
#[test]
fn turn_directions() {
    let (network, roundabout) = build();
    let intersection = network.intersection(roundabout.manager);
    let [north, west, south, east] = roundabout.roads;
    let turn = |from, to| intersection.calc_turn_direction(arrival(&network, from), departure(&network, to));

    for road in roundabout.roads {
        assert_eq!(turn(road, road), TurnDirection::Straight);
        let dual = network.road(road).dual().unwrap();
        assert_eq!(turn(road, dual), TurnDirection::UTurn);
    }
    assert_eq!(turn(north, east), TurnDirection::Right);
    assert_eq!(turn(north, west), TurnDirection::Left);
    assert_eq!(turn(south, west), TurnDirection::Right);
    assert_eq!(turn(south, east), TurnDirection::Left);
    assert_eq!(turn(east, south), TurnDirection::Right);
    assert_eq!(turn(west, north), TurnDirection::Right);
}

/// Test that traversal distances are the same from every arm, and grow with
/// the number of quadrants of the ring the turn covers.
#[test]
fn traversal_distances_are_symmetric_and_ordered() {
    let (network, roundabout) = build();
    let model = TrackModel::new(network.shared_intersection(roundabout.manager));
    let roads = roundabout.roads;
    let dist = |from: usize, to: usize| model.road_traversal_distance(roads[from], roads[to]);

    // Roads are in circulation order, so the next road is a right turn and the previous a left
    let straight = dist(0, 0);
    let right = dist(0, 3);
    let left = dist(0, 1);
    for i in 0..4 {
        assert_approx_eq!(dist(i, i), straight, 1e-4);
        assert_approx_eq!(dist(i, (i + 3) % 4), right, 1e-4);
        assert_approx_eq!(dist(i, (i + 1) % 4), left, 1e-4);
    }
    assert!(right < straight);
    assert!(straight < left);

    // A U-turn takes no ring lanes at all
    assert!(dist(0, 2) < right);
}

/// Test that memoised distances are identical to freshly computed ones.
#[test]
fn traversal_distance_is_memoised() {
    let (network, roundabout) = build();
    let model = TrackModel::new(network.shared_intersection(roundabout.manager));
    let from = arrival(&network, roundabout.roads[0]);
    let to = departure(&network, roundabout.roads[1]);
    let first = model.traversal_distance(from, to);
    let second = model.traversal_distance(from, to);
    assert_eq!(first.to_bits(), second.to_bits());
    assert_eq!(first.to_bits(), model.track(from, to).length().to_bits());
}

/// Test that the road overload agrees with the lane overload.
#[test]
fn road_and_lane_distances_agree() {
    let (network, roundabout) = build();
    let model = TrackModel::new(network.shared_intersection(roundabout.manager));
    for (i, name) in ROAD_NAMES.iter().enumerate() {
        let road = network.road_by_name(name).unwrap().id();
        assert_eq!(road, roundabout.roads[i]);
        let to = roundabout.roads[(i + 1) % 4];
        assert_eq!(
            model.road_traversal_distance(road, to),
            model.traversal_distance(arrival(&network, road), departure(&network, to))
        );
    }
}
