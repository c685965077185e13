use crate::lane::LaneRole;
use crate::{LaneId, LaneSet, RoadId};
use smallvec::SmallVec;

/// A road is a named chain of lanes which runs from one edge of the map,
/// through an intersection, and out the other side.
#[derive(Clone, Debug)]
pub struct Road {
    /// The road ID.
    id: RoadId,
    /// The road's name, unique within a network.
    name: String,
    /// The lanes of the road, in order of travel.
    lanes: SmallVec<[LaneId; 8]>,
    /// The road running in the opposite direction.
    dual: Option<RoadId>,
}

/// The attributes of a road.
pub struct RoadAttributes<'a> {
    /// The road's name.
    pub name: &'a str,
    /// The lanes of the road, in order of travel.
    pub lanes: &'a [LaneId],
}

impl Road {
    pub(crate) fn new(id: RoadId, attribs: &RoadAttributes) -> Self {
        Self {
            id,
            name: attribs.name.to_owned(),
            lanes: attribs.lanes.iter().copied().collect(),
            dual: None,
        }
    }

    pub fn id(&self) -> RoadId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The lanes of the road, in order of travel.
    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    /// The road running in the opposite direction, if there is one.
    pub fn dual(&self) -> Option<RoadId> {
        self.dual
    }

    /// Returns true if the lane belongs to this road.
    pub fn contains(&self, lane: LaneId) -> bool {
        self.lanes.contains(&lane)
    }

    /// The lanes of the road playing the given role, in order of travel.
    pub(crate) fn lanes_with_role<'a>(
        &'a self,
        lanes: &'a LaneSet,
        role: LaneRole,
    ) -> impl Iterator<Item = LaneId> + 'a {
        self.lanes
            .iter()
            .copied()
            .filter(move |id| lanes[*id].role() == role)
    }

    pub(crate) fn set_dual(&mut self, dual: RoadId) {
        self.dual = Some(dual);
    }
}
