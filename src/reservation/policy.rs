use super::admission::AdmissionControl;
use super::message::{I2VMessage, Request};

/// Decides the order in which requests are considered, and how each one is answered.
///
/// The default methods consider requests in the order they were received and
/// answer each with [AdmissionControl::respond].
pub trait Policy {
    /// Orders a batch of requests received consecutively.
    fn order(&mut self, _requests: &mut [Request], _now: f64) {}

    /// Answers a single request.
    fn admit(&mut self, admission: &mut AdmissionControl, request: &Request, now: f64) -> I2VMessage {
        admission.respond(request, now)
    }
}

/// First come, first served.
#[derive(Clone, Copy, Debug, Default)]
pub struct FcfsPolicy;

impl Policy for FcfsPolicy {}

/// Considers the request which proposes to arrive soonest first, much like
/// vehicles taking turns at a stop sign.
#[derive(Clone, Copy, Debug, Default)]
pub struct EarliestArrivalPolicy;

impl Policy for EarliestArrivalPolicy {
    fn order(&mut self, requests: &mut [Request], _now: f64) {
        let earliest = |request: &Request| {
            request
                .proposals
                .iter()
                .map(|p| p.arrival_time)
                .fold(f64::INFINITY, f64::min)
        };
        // Stable, so ties keep their received order
        requests.sort_by(|a, b| earliest(a).total_cmp(&earliest(b)));
    }
}
