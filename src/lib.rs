pub use cgmath;
pub use intersection::{Circle, Intersection, TurnDirection};
pub use lane::{Lane, LaneAttributes, LaneKind, LaneReservationIndex, LaneRole, UNREACHABLE};
pub use layout::RoundaboutLayout;
pub use network::Network;
pub use reservation::{
    AccelerationPhase, AccelerationProfile, AdmissionControl, Cancel, Confirm, ConfigError, Done,
    EarliestArrivalPolicy, FcfsPolicy, I2VMessage, IntersectionManager, Plan, Policy, Proposal,
    Reject, RejectReason, Request, ReservationConfig, ReservationGrid, ReservationId, Tile,
    TileId, V2IMessage, VehicleSpec,
};
pub use road::{Road, RoadAttributes};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use track::{Track, TrackModel};
pub use util::Interval;

mod intersection;
mod lane;
pub mod layout;
pub mod math;
mod network;
mod reservation;
mod road;
mod track;
mod util;

new_key_type! {
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a [Road].
    pub struct RoadId;
    /// Unique ID of an [IntersectionManager].
    pub struct ManagerId;
}

/// Unique ID of a vehicle, assigned by whatever drives the vehicles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u32);

type LaneSet = SlotMap<LaneId, Lane>;
type RoadSet = SlotMap<RoadId, Road>;
