//! Vehicle movement model.
//!
//! [`VehicleSim`] is the vehicle's own view of the world. It is a pure state
//! machine: the runner feeds it assignments and movement ticks and sends
//! whatever messages it returns.

use fleet_model::{
    Coordinate, RideCompletionReport, TaskAssignment, VehicleId, VehicleState, VehicleStatus,
    fare_for,
};
use fleet_net::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    ToPickup,
    ToDestination,
}

#[derive(Debug, Clone, Copy)]
struct Job {
    task: TaskAssignment,
    leg: Leg,
}

/// A simulated taxi.
#[derive(Debug, Clone)]
pub struct VehicleSim {
    state: VehicleState,
    price_per_unit: f64,
    job: Option<Job>,
}

impl VehicleSim {
    #[must_use]
    pub fn new(id: VehicleId, start: Coordinate, price_per_unit: f64) -> Self {
        Self {
            state: VehicleState::idle(id, start),
            price_per_unit,
            job: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// The assignment currently being driven, if any.
    #[must_use]
    pub fn task(&self) -> Option<&TaskAssignment> {
        self.job.as_ref().map(|job| &job.task)
    }

    /// Current position and status as a report.
    #[must_use]
    pub fn report(&self) -> Message {
        Message::VehicleReport(self.state)
    }

    /// Take on `task`. Refused if it names another vehicle or this one is
    /// already busy.
    pub fn on_assignment(&mut self, task: TaskAssignment) -> bool {
        if task.vehicle_id != self.state.id || self.job.is_some() {
            return false;
        }
        self.job = Some(Job {
            task,
            leg: Leg::ToPickup,
        });
        self.state.status = VehicleStatus::EnRouteToPickup;
        true
    }

    /// Advance one movement tick and return the messages to send, in order.
    ///
    /// Idle vehicles stand still and report nothing. A vehicle that has just
    /// reached the pickup reports once more as en route, so the server sees
    /// it waiting there, and takes the rider on board on the following tick.
    pub fn step(&mut self) -> Vec<Message> {
        let Some(job) = self.job.as_mut() else {
            return Vec::new();
        };
        let pickup = job.task.request.origin;
        let destination = job.task.request.destination;

        if job.leg == Leg::ToPickup {
            if self.state.position == pickup {
                job.leg = Leg::ToDestination;
                self.state.status = VehicleStatus::Transporting;
            } else {
                self.state.position = self.state.position.step_toward(pickup);
                return vec![self.report()];
            }
        }

        if self.state.position != destination {
            self.state.position = self.state.position.step_toward(destination);
        }
        let mut out = vec![self.report()];
        if self.state.position == destination {
            out.extend(self.finish());
        }
        out
    }

    /// Drop the rider off: credit the ride, go idle.
    fn finish(&mut self) -> Vec<Message> {
        let Some(job) = self.job.take() else {
            return Vec::new();
        };
        let distance = f64::from(job.task.request.trip_distance());
        let fare = fare_for(distance, self.price_per_unit);
        self.state.stats.record_ride(distance, fare);
        self.state.status = VehicleStatus::Idle;
        vec![
            Message::RideCompleted(RideCompletionReport {
                vehicle_id: self.state.id,
                client_id: job.task.client_id(),
                distance_covered: distance,
                fare,
            }),
            self.report(),
        ]
    }
}
