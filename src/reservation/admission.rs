use super::config::ReservationConfig;
use super::grid::{ReservationGrid, TileId};
use super::message::{Confirm, I2VMessage, Proposal, Reject, RejectReason, Request, ReservationId, VehicleSpec};
use super::plan::{Motion, Plan};
use crate::intersection::Intersection;
use crate::math::{from_heading, rot90};
use crate::track::{Track, TrackModel};
use crate::VehicleId;
use log::{debug, trace, warn};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Decides whether a proposal can be granted, by checking the space-time
/// tiles it needs against those already reserved.
///
/// This knows nothing about the order in which requests are considered,
/// which is left to a [Policy](super::Policy).
pub struct AdmissionControl {
    track: TrackModel,
    grid: ReservationGrid,
    config: ReservationConfig,
    /// The confirmed reservation of each vehicle.
    reservations: HashMap<VehicleId, Reservation>,
    next_id: u64,
}

/// A confirmed reservation.
struct Reservation {
    id: ReservationId,
    tiles: Vec<(TileId, i64)>,
    /// The last time step any tile is held for.
    last_step: i64,
}

impl AdmissionControl {
    /// Creates an admission control with an empty grid covering the intersection.
    pub fn new(intersection: Rc<Intersection>, config: ReservationConfig) -> Self {
        let grid = ReservationGrid::new(&intersection, config.granularity, config.grid_time_step);
        Self {
            track: TrackModel::new(intersection),
            grid,
            config,
            reservations: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn track(&self) -> &TrackModel {
        &self.track
    }

    pub fn grid(&self) -> &ReservationGrid {
        &self.grid
    }

    pub fn config(&self) -> &ReservationConfig {
        &self.config
    }

    /// Returns true if the vehicle holds a confirmed reservation.
    pub fn has_reservation(&self, vehicle: VehicleId) -> bool {
        self.reservations.contains_key(&vehicle)
    }

    /// The vehicle's confirmed reservation, if any.
    pub fn reservation(&self, vehicle: VehicleId) -> Option<ReservationId> {
        self.reservations.get(&vehicle).map(|r| r.id)
    }

    /// The number of confirmed reservations.
    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Works out the plan for a proposal, without reserving anything.
    pub fn query(&self, request: &Request, proposal: &Proposal, now: f64) -> Result<Plan, RejectReason> {
        if proposal.arrival_time < now {
            return Err(RejectReason::ArrivalTimeTooLate);
        }
        if proposal.arrival_time > now + self.config.max_future_reservation_time {
            return Err(RejectReason::ArrivalTimeTooLarge);
        }

        let intersection = self.track.intersection();
        if !intersection.is_entered_by(proposal.arrival_lane)
            || !intersection.is_exited_by(proposal.departure_lane)
        {
            warn!(
                "{:?} proposed to cross from {:?} to {:?}, which do not enter and exit the intersection",
                request.vehicle, proposal.arrival_lane, proposal.departure_lane
            );
            return Err(RejectReason::NoClearPath);
        }

        let track = self.track.track(proposal.arrival_lane, proposal.departure_lane);
        let ring_speed_limit = track.lanes()[1..track.lanes().len() - 1]
            .iter()
            .map(|id| intersection.lane(*id).speed_limit())
            .fold(f64::INFINITY, f64::min);
        let ideal_velocity = f64::min(ring_speed_limit, proposal.max_turn_velocity);
        let motion = Motion::new(
            proposal.arrival_velocity,
            ideal_velocity,
            request.spec.max_acceleration,
        );
        trace!(
            "{:?} arrives at {:.2} m/s (accelerating: {}), ideal speed {:.2} m/s",
            request.vehicle,
            proposal.arrival_velocity,
            proposal.accelerating,
            ideal_velocity
        );
        if !motion.is_moving() {
            warn!("{:?} proposed to cross without moving", request.vehicle);
            return Err(RejectReason::NoClearPath);
        }

        let clear_after = self.clear_after(&track, &motion, &request.spec);
        if clear_after > self.config.max_reservation_duration {
            warn!(
                "{:?} would hold the intersection for {:.1}s, longer than the {:.1}s allowed",
                request.vehicle, clear_after, self.config.max_reservation_duration
            );
            return Err(RejectReason::NoClearPath);
        }

        let tiles = self.occupancy(
            &track,
            &motion,
            clear_after,
            &request.spec,
            proposal.arrival_time,
        );
        let conflict = tiles.iter().find(|(tile, step)| {
            matches!(self.grid.holder(*tile, *step), Some(holder) if holder != request.vehicle)
        });
        if let Some((tile, step)) = conflict {
            trace!(
                "{:?} conflicts with {:?} on {:?} at step {}",
                request.vehicle,
                self.grid.holder(*tile, *step),
                tile,
                step
            );
            return Err(RejectReason::NoClearPath);
        }

        let exit_after = motion.time_to_travel(track.internal_length());
        Ok(Plan {
            tiles,
            exit_time: proposal.arrival_time + exit_after,
            exit_velocity: motion.velocity_at(exit_after),
            acceleration_profile: motion.profile(exit_after),
        })
    }

    /// Commits a plan, reserving all of its tiles for the vehicle.
    ///
    /// Fails if the vehicle already holds a reservation, or if any tile has
    /// since been reserved by another vehicle.
    pub fn accept(&mut self, vehicle: VehicleId, plan: &Plan) -> Result<ReservationId, RejectReason> {
        if self.has_reservation(vehicle) {
            return Err(RejectReason::ConfirmedAnotherRequest);
        }
        let clear = plan.tiles.iter().all(|(tile, step)| {
            self.grid
                .holder(*tile, *step)
                .map_or(true, |holder| holder == vehicle)
        });
        if !clear {
            return Err(RejectReason::NoClearPath);
        }

        for (tile, step) in &plan.tiles {
            self.grid.reserve(*tile, *step, vehicle);
        }
        let id = ReservationId(self.next_id);
        self.next_id += 1;
        self.reservations.insert(
            vehicle,
            Reservation {
                id,
                tiles: plan.tiles.clone(),
                last_step: plan.tiles.iter().map(|(_, step)| *step).max().unwrap_or(i64::MIN),
            },
        );
        Ok(id)
    }

    /// Releases every tile of a vehicle's reservation.
    ///
    /// Returns false if the vehicle holds no reservation with that ID.
    pub fn cancel(&mut self, vehicle: VehicleId, reservation: ReservationId) -> bool {
        match self.reservations.get(&vehicle) {
            Some(r) if r.id == reservation => {}
            _ => {
                warn!("{:?} holds no reservation {:?}", vehicle, reservation);
                return false;
            }
        }
        if let Some(r) = self.reservations.remove(&vehicle) {
            for (tile, step) in r.tiles {
                self.grid.release(tile, step, vehicle);
            }
        }
        true
    }

    /// Forgets every tile reservation for a time step which has passed, and
    /// every reservation whose tiles have all passed.
    pub fn clean_up(&mut self, now: f64) {
        let step = self.grid.time_step(now);
        self.grid.clean_up(step);
        self.reservations.retain(|vehicle, r| {
            let live = r.last_step >= step;
            if !live {
                debug!("Expired {:?} of {:?}", r.id, vehicle);
            }
            live
        });
    }

    /// Answers a request: confirms the first proposal which can be granted,
    /// or rejects them all.
    ///
    /// When every proposal fails, the reason is [RejectReason::NoClearPath] if
    /// any proposal got as far as the tile check, and otherwise the reason the
    /// first proposal failed.
    pub fn respond(&mut self, request: &Request, now: f64) -> I2VMessage {
        let reject = |reason| {
            debug!("Rejected request {} of {:?}: {:?}", request.request_id, request.vehicle, reason);
            I2VMessage::Reject(Reject {
                vehicle: request.vehicle,
                manager: request.manager,
                request_id: request.request_id,
                reason,
            })
        };

        if self.has_reservation(request.vehicle) {
            return reject(RejectReason::ConfirmedAnotherRequest);
        }

        let mut reason = None;
        for proposal in &request.proposals {
            match self.query(request, proposal, now) {
                Ok(plan) => {
                    let reservation_id = match self.accept(request.vehicle, &plan) {
                        Ok(id) => id,
                        Err(err) => return reject(err),
                    };
                    debug!(
                        "Confirmed request {} of {:?} as {:?}, exiting at {:.2}s",
                        request.request_id, request.vehicle, reservation_id, plan.exit_time
                    );
                    return I2VMessage::Confirm(Confirm {
                        vehicle: request.vehicle,
                        manager: request.manager,
                        request_id: request.request_id,
                        reservation_id,
                        proposal: *proposal,
                        exit_time: plan.exit_time,
                        exit_velocity: plan.exit_velocity,
                        acceleration_profile: plan.acceleration_profile,
                    });
                }
                Err(RejectReason::NoClearPath) => reason = Some(RejectReason::NoClearPath),
                Err(err) => {
                    reason.get_or_insert(err);
                }
            }
        }

        if request.proposals.is_empty() {
            warn!("Request {} of {:?} has no proposals", request.request_id, request.vehicle);
        }
        reject(reason.unwrap_or(RejectReason::NoClearPath))
    }

    /// How long after arriving the rear of the vehicle, plus its buffer,
    /// clears the exit point.
    fn clear_after(&self, track: &Track, motion: &Motion, spec: &VehicleSpec) -> f64 {
        let buffer = self.config.static_buffer_size;
        motion.time_to_travel(track.internal_length() + spec.length + 2.0 * buffer)
    }

    /// Works out which tiles a vehicle holds at which time steps as it
    /// follows a track, arriving at the entry point at `arrival_time`.
    ///
    /// The vehicle holds tiles from when its front enters the region until
    /// its rear leaves it.
    fn occupancy(
        &self,
        track: &Track,
        motion: &Motion,
        clear_after: f64,
        spec: &VehicleSpec,
        arrival_time: f64,
    ) -> Vec<(TileId, i64)> {
        let intersection = self.track.intersection();
        let buffer = self.config.static_buffer_size;
        let dt = self.grid.time_step_size();
        let spacing = 0.5 / self.config.granularity;

        let first = self.grid.time_step(arrival_time);
        let last = self.grid.time_step(arrival_time + clear_after);

        let mut occupied = BTreeSet::new();
        for step in first..=last {
            let t0 = f64::max(step as f64 * dt, arrival_time) - arrival_time;
            let t1 = f64::min((step + 1) as f64 * dt, arrival_time + clear_after) - arrival_time;
            let rear = track.entry() + motion.distance_at(t0) - spec.length - buffer;
            let front = track.entry() + motion.distance_at(t1) + buffer;
            let from = f64::max(rear, track.entry());
            let to = f64::min(front, track.exit());
            if from > to {
                continue;
            }

            let samples = usize::max(((to - from) / spacing).ceil() as usize, 1);
            for i in 0..=samples {
                let along = from + (to - from) * i as f64 / samples as f64;
                let (point, heading) = track.pose_at(intersection, along);
                let lat = rot90(from_heading(heading)) * (0.5 * spec.width);
                for offset in [-1.0, 0.0, 1.0] {
                    occupied.insert((self.grid.tile_at(point + lat * offset), step));
                }
            }
        }

        let mut tiles = BTreeSet::new();
        for (tile, step) in occupied {
            let buffer = self.config.tile_time_buffer(self.grid.tile(tile).is_edge());
            let margin = (buffer / dt - 1e-9).ceil() as i64;
            tiles.extend((step - margin..=step + margin).map(|s| (tile, s)));
        }
        tiles.into_iter().collect()
    }
}
