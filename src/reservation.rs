//! Reservation-based admission control.
//!
//! Vehicles send a [Request] to an [IntersectionManager] asking to cross the
//! intersection along one of several [Proposal]s. The manager checks each
//! proposal against a [ReservationGrid] of space-time tiles, and replies with
//! a [Confirm] for the first proposal whose tiles are all free, or a [Reject].

pub use admission::AdmissionControl;
pub use config::{ConfigError, ReservationConfig};
pub use grid::{ReservationGrid, Tile, TileId};
pub use manager::IntersectionManager;
pub use message::{
    Cancel, Confirm, Done, I2VMessage, Proposal, Reject, RejectReason, Request, ReservationId,
    V2IMessage, VehicleSpec,
};
pub use plan::{AccelerationPhase, AccelerationProfile, Plan};
pub use policy::{EarliestArrivalPolicy, FcfsPolicy, Policy};

mod admission;
mod config;
mod grid;
mod manager;
mod message;
mod plan;
mod policy;
