use super::plan::AccelerationProfile;
use crate::{LaneId, ManagerId, VehicleId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Unique ID of a confirmed reservation, assigned by the manager that confirmed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub u64);

/// The dimensions and capabilities of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    /// The vehicle's length in m.
    pub length: f64,
    /// The vehicle's width in m.
    pub width: f64,
    /// The maximum acceleration in m/s^2.
    pub max_acceleration: f64,
    /// The maximum deceleration in m/s^2, as a positive number.
    pub max_deceleration: f64,
}

/// One way a vehicle proposes to cross the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// The lane the vehicle arrives on.
    pub arrival_lane: LaneId,
    /// The lane the vehicle departs on.
    pub departure_lane: LaneId,
    /// The time the front of the vehicle reaches the entry point, in s.
    pub arrival_time: f64,
    /// The vehicle's velocity at the entry point, in m/s.
    pub arrival_velocity: f64,
    /// The fastest the vehicle is willing to turn, in m/s.
    pub max_turn_velocity: f64,
    /// Whether the vehicle is accelerating as it arrives. Informational only:
    /// a vehicle arriving below the ideal speed is always planned to accelerate up to it.
    #[serde(default)]
    pub accelerating: bool,
}

/// A vehicle's request for a reservation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub vehicle: VehicleId,
    pub manager: ManagerId,
    /// Numbers the vehicle's requests, so it can match up the replies.
    pub request_id: u32,
    pub spec: VehicleSpec,
    /// The proposals, in order of preference.
    pub proposals: SmallVec<[Proposal; 2]>,
}

/// Confirms a reservation for one of the proposals of a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Confirm {
    pub vehicle: VehicleId,
    pub manager: ManagerId,
    pub request_id: u32,
    pub reservation_id: ReservationId,
    /// The proposal which was accepted.
    pub proposal: Proposal,
    /// The time the front of the vehicle reaches the exit point, in s.
    pub exit_time: f64,
    /// The vehicle's velocity at the exit point, in m/s.
    pub exit_velocity: f64,
    /// How the vehicle must accelerate from the entry point onwards.
    pub acceleration_profile: AccelerationProfile,
}

/// Why a request was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// The proposed arrival time has already passed.
    ArrivalTimeTooLate,
    /// The proposed arrival time is too far in the future.
    ArrivalTimeTooLarge,
    /// Another vehicle holds part of the space the vehicle needs.
    NoClearPath,
    /// The vehicle already holds a reservation.
    ConfirmedAnotherRequest,
}

/// Rejects every proposal of a request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reject {
    pub vehicle: VehicleId,
    pub manager: ManagerId,
    pub request_id: u32,
    pub reason: RejectReason,
}

/// Gives up a reservation before using it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cancel {
    pub vehicle: VehicleId,
    pub manager: ManagerId,
    pub reservation_id: ReservationId,
}

/// Reports that a vehicle has cleared the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Done {
    pub vehicle: VehicleId,
    pub manager: ManagerId,
    pub reservation_id: ReservationId,
}

/// A message from a vehicle to an intersection manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum V2IMessage {
    Request(Request),
    Cancel(Cancel),
    Done(Done),
}

/// A message from an intersection manager to a vehicle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum I2VMessage {
    Confirm(Confirm),
    Reject(Reject),
}

impl V2IMessage {
    /// The vehicle which sent the message.
    pub fn vehicle(&self) -> VehicleId {
        match self {
            V2IMessage::Request(msg) => msg.vehicle,
            V2IMessage::Cancel(msg) => msg.vehicle,
            V2IMessage::Done(msg) => msg.vehicle,
        }
    }

    /// The manager the message is addressed to.
    pub fn manager(&self) -> ManagerId {
        match self {
            V2IMessage::Request(msg) => msg.manager,
            V2IMessage::Cancel(msg) => msg.manager,
            V2IMessage::Done(msg) => msg.manager,
        }
    }
}

impl I2VMessage {
    /// The vehicle the message is addressed to.
    pub fn vehicle(&self) -> VehicleId {
        match self {
            I2VMessage::Confirm(msg) => msg.vehicle,
            I2VMessage::Reject(msg) => msg.vehicle,
        }
    }

    /// The request the message replies to.
    pub fn request_id(&self) -> u32 {
        match self {
            I2VMessage::Confirm(msg) => msg.request_id,
            I2VMessage::Reject(msg) => msg.request_id,
        }
    }
}
