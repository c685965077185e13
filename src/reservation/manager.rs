use super::admission::AdmissionControl;
use super::config::{ConfigError, ReservationConfig};
use super::message::{I2VMessage, Request, V2IMessage};
use super::policy::{FcfsPolicy, Policy};
use crate::intersection::Intersection;
use crate::track::TrackModel;
use crate::{ManagerId, Network};
use log::{debug, warn};
use std::collections::VecDeque;

/// Controls access to an intersection by granting reservations to vehicles.
///
/// Messages are queued as they are received, and only processed when the
/// manager acts.
pub struct IntersectionManager {
    id: ManagerId,
    admission: AdmissionControl,
    policy: Box<dyn Policy>,
    inbox: VecDeque<V2IMessage>,
    outbox: Vec<I2VMessage>,
    /// The current simulation time in s.
    now: f64,
    /// The number of vehicles which have reported clearing the intersection.
    completed: usize,
}

impl IntersectionManager {
    /// Creates a first come, first served manager for an intersection of the network.
    pub fn new(
        network: &Network,
        id: ManagerId,
        config: ReservationConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_policy(network, id, config, Box::new(FcfsPolicy))
    }

    /// Creates a manager which follows the given policy.
    pub fn with_policy(
        network: &Network,
        id: ManagerId,
        config: ReservationConfig,
        policy: Box<dyn Policy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id,
            admission: AdmissionControl::new(network.shared_intersection(id), config),
            policy,
            inbox: VecDeque::new(),
            outbox: vec![],
            now: 0.0,
            completed: 0,
        })
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// The current simulation time in s.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// The number of vehicles which have reported clearing the intersection.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn intersection(&self) -> &Intersection {
        self.admission.track().intersection()
    }

    pub fn track(&self) -> &TrackModel {
        self.admission.track()
    }

    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    /// Queues a message to be processed the next time the manager acts.
    pub fn receive(&mut self, message: V2IMessage) {
        if message.manager() != self.id {
            warn!(
                "Manager {:?} dropped a message from {:?} addressed to {:?}",
                self.id,
                message.vehicle(),
                message.manager()
            );
            return;
        }
        self.inbox.push_back(message);
    }

    /// Processes every queued message at the current time, in the order they
    /// were received, then advances the clock by `time_step` seconds.
    ///
    /// Each run of consecutive requests is handed to the policy, which may
    /// reorder it. Cancellations are never reordered relative to requests.
    pub fn act(&mut self, time_step: f64) {
        self.admission.clean_up(self.now);

        let mut batch: Vec<Request> = vec![];
        while let Some(message) = self.inbox.pop_front() {
            match message {
                V2IMessage::Request(request) => batch.push(request),
                V2IMessage::Cancel(cancel) => {
                    self.process_requests(&mut batch);
                    if self.admission.cancel(cancel.vehicle, cancel.reservation_id) {
                        debug!("{:?} cancelled {:?}", cancel.vehicle, cancel.reservation_id);
                    }
                }
                V2IMessage::Done(done) => {
                    self.process_requests(&mut batch);
                    if self.admission.cancel(done.vehicle, done.reservation_id) {
                        self.completed += 1;
                        debug!("{:?} cleared the intersection", done.vehicle);
                    }
                }
            }
        }
        self.process_requests(&mut batch);

        self.now += time_step;
    }

    /// Acts for one simulation time step, as configured.
    pub fn tick(&mut self) {
        let time_step = self.admission.config().simulation_time_step;
        self.act(time_step);
    }

    /// Takes every reply sent since the last call.
    pub fn drain_outbox(&mut self) -> Vec<I2VMessage> {
        std::mem::take(&mut self.outbox)
    }

    fn process_requests(&mut self, batch: &mut Vec<Request>) {
        if batch.is_empty() {
            return;
        }
        self.policy.order(batch, self.now);
        for request in batch.drain(..) {
            let reply = self.policy.admit(&mut self.admission, &request, self.now);
            self.outbox.push(reply);
        }
    }
}
